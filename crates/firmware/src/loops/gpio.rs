//! PS GPIO walk: light four outputs in turn, then log four inputs and
//! whether an edge interrupt arrived on the first input since the last log.

use control_core::dispatch::{FlagHandler, InterruptManager};
use control_core::event::EventFlag;
use control_core::fatal::FatalReason;
use embedded_hal::delay::DelayNs;
use platform::console::Console;
use platform::gpio::{Direction, EdgeQualifier, GpioBank, InterruptMode, PinId, PinState};
use platform::interrupt::{InterruptController, IrqSource};

use super::{line, ControlLoop, Progress};
use crate::board;

/// GPIO loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioLoopConfig {
    /// Outputs, lit in this order
    pub outputs: [PinId; 4],
    /// Logged inputs with their labels
    pub inputs: [(&'static str, PinId); 4],
    /// Input whose rising edge raises the interrupt
    pub edge_pin: PinId,
    /// GPIO bank interrupt
    pub irq: IrqSource,
    /// Delay before each output step
    pub step_ms: u32,
}

impl Default for GpioLoopConfig {
    fn default() -> Self {
        Self {
            outputs: board::JE_OUTPUTS,
            inputs: board::JE_INPUTS,
            edge_pin: board::JE7,
            irq: board::GPIO_IRQ,
            step_ms: 250,
        }
    }
}

/// Output walk plus input log.
pub struct GpioLoop<'a, G, D, W> {
    gpio: G,
    delay: D,
    console: W,
    flag: &'a EventFlag,
    config: GpioLoopConfig,
    step: usize,
}

impl<'a, G, D, W> GpioLoop<'a, G, D, W>
where
    G: GpioBank,
    G::Line: 'a,
    D: DelayNs,
    W: Console,
{
    /// Configure directions and the edge interrupt, bind its handler.
    pub fn init<C: InterruptController, const N: usize>(
        mut gpio: G,
        delay: D,
        irq: &mut InterruptManager<'_, 'a, C, N>,
        flag: &'a EventFlag,
        slot: &'a mut Option<FlagHandler<'a, G::Line>>,
        console: W,
        config: GpioLoopConfig,
    ) -> Result<Self, FatalReason> {
        for pin in config.outputs {
            gpio.set_direction(pin, Direction::Output);
            gpio.set_output_enable(pin, true);
        }
        for (_, pin) in config.inputs {
            gpio.set_direction(pin, Direction::Input);
        }
        gpio.set_interrupt_mode(config.edge_pin, InterruptMode::RisingEdge);

        let handler: &'a FlagHandler<'a, G::Line> =
            slot.insert(FlagHandler::new(gpio.line(config.edge_pin, EdgeQualifier::Any), flag));
        irq.bind(config.irq, handler)?;
        gpio.enable_interrupt(config.edge_pin);
        irq.enable(config.irq)?;

        Ok(Self {
            gpio,
            delay,
            console,
            flag,
            config,
            step: 0,
        })
    }

    /// The GPIO driver.
    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    fn light(&mut self, index: usize) {
        for (i, pin) in self.config.outputs.into_iter().enumerate() {
            self.gpio.write_pin(pin, PinState::from(i == index));
        }
    }

    fn log_inputs(&mut self) {
        for (label, pin) in self.config.inputs {
            let state = self.gpio.read_pin(pin);
            self.console
                .write_line(&line::<24>(format_args!("{label} is {}", state.as_str())));
        }
        if self.flag.take() {
            let label = self
                .config
                .inputs
                .iter()
                .find(|(_, pin)| *pin == self.config.edge_pin)
                .map_or("edge pin", |(label, _)| *label);
            self.console
                .write_line(&line::<48>(format_args!("{label} Rising Edge IRQ occurred!")));
        }
        self.console.write_line("");
    }
}

impl<'a, G, D, W> ControlLoop for GpioLoop<'a, G, D, W>
where
    G: GpioBank,
    G::Line: 'a,
    D: DelayNs,
    W: Console,
{
    /// One output step; the step that completes the walk also logs.
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        self.delay.delay_ms(self.config.step_ms);
        self.light(self.step);
        self.step = self.step.saturating_add(1);
        if self.step >= self.config.outputs.len() {
            self.step = 0;
            self.log_inputs();
        }
        Ok(Progress::Acted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::dispatch::DispatchTable;
    use platform::mocks::{MockConsole, MockDelay, MockGic, MockGpio, MockGpioLine};

    #[test]
    fn walk_lights_one_output_at_a_time_then_logs() {
        let flag = EventFlag::new();
        let mut slot: Option<FlagHandler<'_, MockGpioLine>> = None;
        let console = MockConsole::new();
        let delay = MockDelay::new();
        let gpio = MockGpio::new();
        let pins = gpio.handle();
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        let mut irq = InterruptManager::new(MockGic::new(), &table);

        let mut lp = GpioLoop::init(
            gpio,
            delay.clone(),
            &mut irq,
            &flag,
            &mut slot,
            console.clone(),
            GpioLoopConfig::default(),
        )
        .unwrap();
        assert_eq!(lp.gpio().direction(board::JE1), Some(Direction::Output));
        assert!(lp.gpio().output_enabled(board::JE4));
        assert_eq!(lp.gpio().direction(board::JE10), Some(Direction::Input));

        pins.drive_input(board::JE9, PinState::High);
        for step in 0..4 {
            lp.poll().unwrap();
            for (i, pin) in board::JE_OUTPUTS.into_iter().enumerate() {
                let want = if i == step { PinState::High } else { PinState::Low };
                assert_eq!(pins.level(pin), want);
            }
        }
        assert_eq!(delay.total_ns(), 4 * 250_000_000);
        assert_eq!(
            console.lines(),
            vec!["JE7 is LOW", "JE8 is LOW", "JE9 is HIGH", "JE10 is LOW", ""]
        );
    }

    #[test]
    fn edge_flag_is_reported_once() {
        let flag = EventFlag::new();
        let mut slot: Option<FlagHandler<'_, MockGpioLine>> = None;
        let console = MockConsole::new();
        let gpio = MockGpio::new();
        let pins = gpio.handle();
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        let mut irq = InterruptManager::new(MockGic::new(), &table);

        let mut lp = GpioLoop::init(
            gpio,
            MockDelay::new(),
            &mut irq,
            &flag,
            &mut slot,
            console.clone(),
            GpioLoopConfig::default(),
        )
        .unwrap();

        assert!(pins.drive_input(board::JE7, PinState::High));
        assert!(table.dispatch(board::GPIO_IRQ));
        for _ in 0..8 {
            lp.poll().unwrap();
        }
        assert_eq!(console.count("JE7 Rising Edge IRQ occurred!"), 1);
        assert_eq!(console.count("JE7 is HIGH"), 2);
        assert_eq!(console.count(""), 2);
    }

    #[test]
    fn falling_edge_does_not_latch() {
        let gpio = MockGpio::new();
        let pins = gpio.handle();
        let flag = EventFlag::new();
        let mut slot: Option<FlagHandler<'_, MockGpioLine>> = None;
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        let mut irq = InterruptManager::new(MockGic::new(), &table);
        let _lp = GpioLoop::init(
            gpio,
            MockDelay::new(),
            &mut irq,
            &flag,
            &mut slot,
            MockConsole::new(),
            GpioLoopConfig::default(),
        )
        .unwrap();

        assert!(pins.drive_input(board::JE7, PinState::High));
        assert!(!pins.drive_input(board::JE7, PinState::Low));
    }
}
