//! Private timer tick: a one-shot countdown re-armed from its own interrupt.

use control_core::dispatch::{InterruptManager, RearmingHandler};
use control_core::event::EventFlag;
use control_core::fatal::FatalReason;
use platform::console::Console;
use platform::interrupt::{InterruptController, IrqSource};
use platform::timer::OneShotTimer;

use super::{ControlLoop, Progress};
use crate::board;
use crate::boot::ticks_for_ms;

/// Private timer loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivateTimerConfig {
    /// Tick period
    pub period_ms: u32,
    /// Timer interrupt
    pub irq: IrqSource,
}

impl Default for PrivateTimerConfig {
    fn default() -> Self {
        Self {
            period_ms: 1_000,
            irq: board::PRIVATE_TIMER_IRQ,
        }
    }
}

/// Prints `Timer expired!` once per period.
pub struct PrivateTimerLoop<'a, T, W> {
    timer: T,
    flag: &'a EventFlag,
    console: W,
    reload_ticks: u32,
}

impl<'a, T, W> PrivateTimerLoop<'a, T, W>
where
    T: OneShotTimer,
    T::Line: 'a,
    W: Console,
{
    /// Bind the re-arming handler, load one period and start the timer.
    pub fn init<C: InterruptController, const N: usize>(
        mut timer: T,
        irq: &mut InterruptManager<'_, 'a, C, N>,
        flag: &'a EventFlag,
        slot: &'a mut Option<RearmingHandler<'a, T::Line>>,
        console: W,
        config: PrivateTimerConfig,
    ) -> Result<Self, FatalReason> {
        // The timer counts CPU_3x2x, half the core clock.
        let reload_ticks = ticks_for_ms(timer.input_clock_hz(), config.period_ms);
        timer.load(reload_ticks);

        let handler: &'a RearmingHandler<'a, T::Line> =
            slot.insert(RearmingHandler::new(timer.line(), flag, reload_ticks));
        irq.bind(config.irq, handler)?;
        timer.enable_interrupt();
        irq.enable(config.irq)?;
        timer.start();

        Ok(Self {
            timer,
            flag,
            console,
            reload_ticks,
        })
    }

    /// Ticks loaded per period.
    pub fn reload_ticks(&self) -> u32 {
        self.reload_ticks
    }

    /// The timer driver.
    pub fn timer(&self) -> &T {
        &self.timer
    }
}

impl<T, W> ControlLoop for PrivateTimerLoop<'_, T, W>
where
    T: OneShotTimer,
    W: Console,
{
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        if !self.flag.take() {
            return Ok(Progress::Idle);
        }
        self.console.write_line("Timer expired!");
        Ok(Progress::Acted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::dispatch::DispatchTable;
    use platform::clock_config::CPU_3X2X_CLOCK_HZ;
    use platform::mocks::{MockConsole, MockGic, MockIrqLine, MockPrivateTimer};

    #[test]
    fn every_expiry_prints_once_and_rearms() {
        let flag = EventFlag::new();
        let mut slot: Option<RearmingHandler<'_, MockIrqLine>> = None;
        let console = MockConsole::new();
        let timer = MockPrivateTimer::new(CPU_3X2X_CLOCK_HZ);
        let line = timer.line();
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        let mut irq = InterruptManager::new(MockGic::new(), &table);

        let mut lp = PrivateTimerLoop::init(
            timer,
            &mut irq,
            &flag,
            &mut slot,
            console.clone(),
            PrivateTimerConfig::default(),
        )
        .unwrap();
        irq.start();

        assert_eq!(lp.timer().loaded(), CPU_3X2X_CLOCK_HZ);
        assert_eq!(lp.timer().starts(), 1);
        assert_eq!(lp.poll().unwrap(), Progress::Idle);

        for _ in 0..3 {
            assert!(lp.timer().expire());
            assert!(table.dispatch(board::PRIVATE_TIMER_IRQ));
            assert_eq!(lp.poll().unwrap(), Progress::Acted);
            assert_eq!(lp.poll().unwrap(), Progress::Idle);
        }
        assert_eq!(console.count("Timer expired!"), 3);
        assert_eq!(line.rearm_count(), 3);
        assert_eq!(line.last_rearm_ticks(), CPU_3X2X_CLOCK_HZ);
    }
}
