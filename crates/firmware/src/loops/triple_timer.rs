//! Triple timer counter: a 1 Hz tick on counter 0 and a PWM waveform on
//! counter 1.
//!
//! Both counters are configured from the timing solver. The PWM match value
//! is written and read back; a mismatch means the counter did not take the
//! configuration and is fatal.

use control_core::dispatch::{FlagHandler, InterruptManager};
use control_core::event::EventFlag;
use control_core::fatal::FatalReason;
use control_core::timing::{solve_pwm, solve_timer, PwmSpec, TimerConfig, TimerSpec};
use platform::console::Console;
use platform::interrupt::{InterruptController, IrqSource};
use platform::timer::{IntervalTimer, MatchChannel, TimerIrq, TimerOptions};

use super::{ControlLoop, Progress};
use crate::board;

/// Triple timer loop settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripleTimerConfig {
    /// Tick counter frequency
    pub tick_hz: u32,
    /// PWM window frequency
    pub pwm_hz: u32,
    /// PWM duty cycle, `0.0..=1.0`
    pub duty_cycle: f32,
    /// Tick counter interrupt
    pub tick_irq: IrqSource,
}

impl Default for TripleTimerConfig {
    fn default() -> Self {
        Self {
            tick_hz: 1,
            pwm_hz: 1_000,
            duty_cycle: 0.63,
            tick_irq: board::TTC0_0_IRQ,
        }
    }
}

/// Prints `Event!` on every tick while the PWM counter runs freely.
pub struct TripleTimerLoop<'a, T, W> {
    tick: T,
    pwm: T,
    flag: &'a EventFlag,
    console: W,
    tick_config: TimerConfig,
    pwm_config: TimerConfig,
    match_value: u32,
}

fn configure<T: IntervalTimer>(
    timer: &mut T,
    target_hz: u32,
    options: TimerOptions,
) -> Result<TimerConfig, FatalReason> {
    let config = solve_timer(TimerSpec::for_timer(timer, target_hz))?;
    timer.set_options(options);
    timer.set_interval(config.interval);
    timer.set_prescaler(config.prescaler);
    #[cfg(feature = "defmt")]
    defmt::info!(
        "timer {} Hz: prescaler {} interval {}",
        target_hz,
        config.prescaler,
        config.interval
    );
    #[cfg(feature = "emulator")]
    tracing::info!(
        target_hz,
        prescaler = config.prescaler,
        interval = config.interval,
        "timer configured"
    );
    Ok(config)
}

impl<'a, T, W> TripleTimerLoop<'a, T, W>
where
    T: IntervalTimer,
    T::Line: 'a,
    W: Console,
{
    /// Solve and program both counters, bind the tick handler, start both.
    pub fn init<C: InterruptController, const N: usize>(
        mut tick: T,
        mut pwm: T,
        irq: &mut InterruptManager<'_, 'a, C, N>,
        flag: &'a EventFlag,
        slot: &'a mut Option<FlagHandler<'a, T::Line>>,
        console: W,
        config: TripleTimerConfig,
    ) -> Result<Self, FatalReason> {
        let tick_config = configure(
            &mut tick,
            config.tick_hz,
            TimerOptions::INTERVAL_MODE | TimerOptions::WAVE_DISABLE,
        )?;

        let pwm_config = configure(
            &mut pwm,
            config.pwm_hz,
            TimerOptions::INTERVAL_MODE | TimerOptions::MATCH_MODE | TimerOptions::WAVE_POLARITY,
        )?;
        let match_value = solve_pwm(PwmSpec {
            interval: pwm_config.interval,
            duty_cycle: config.duty_cycle,
        })?;
        pwm.set_match_value(MatchChannel::Zero, match_value);
        let readback = pwm.match_value(MatchChannel::Zero);
        if readback != match_value {
            return Err(FatalReason::MatchReadback {
                expected: match_value,
                actual: readback,
            });
        }

        let handler: &'a FlagHandler<'a, T::Line> =
            slot.insert(FlagHandler::new(tick.line(TimerIrq::INTERVAL), flag));
        irq.bind(config.tick_irq, handler)?;
        tick.enable_interrupts(TimerIrq::INTERVAL);
        irq.enable(config.tick_irq)?;

        tick.start();
        pwm.start();

        Ok(Self {
            tick,
            pwm,
            flag,
            console,
            tick_config,
            pwm_config,
            match_value,
        })
    }

    /// Solved tick counter configuration.
    pub fn tick_config(&self) -> TimerConfig {
        self.tick_config
    }

    /// Solved PWM counter configuration.
    pub fn pwm_config(&self) -> TimerConfig {
        self.pwm_config
    }

    /// PWM match value in counter ticks.
    pub fn match_value(&self) -> u32 {
        self.match_value
    }

    /// Tick counter driver.
    pub fn tick_timer(&self) -> &T {
        &self.tick
    }

    /// PWM counter driver.
    pub fn pwm_timer(&self) -> &T {
        &self.pwm
    }
}

impl<T, W> ControlLoop for TripleTimerLoop<'_, T, W>
where
    T: IntervalTimer,
    W: Console,
{
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        if !self.flag.take() {
            return Ok(Progress::Idle);
        }
        self.console.write_line("Event!");
        Ok(Progress::Acted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::dispatch::DispatchTable;
    use control_core::timing::InvalidFrequency;
    use platform::mocks::{MockConsole, MockGic, MockIntervalTimer, MockIrqLine};

    const CLOCK: u32 = 50_000_000;

    #[test]
    fn solves_programs_and_ticks() {
        let flag = EventFlag::new();
        let mut slot: Option<FlagHandler<'_, MockIrqLine>> = None;
        let console = MockConsole::new();
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        let mut irq = InterruptManager::new(MockGic::new(), &table);

        let mut lp = TripleTimerLoop::init(
            MockIntervalTimer::new(CLOCK),
            MockIntervalTimer::new(CLOCK),
            &mut irq,
            &flag,
            &mut slot,
            console.clone(),
            TripleTimerConfig::default(),
        )
        .unwrap();

        assert_eq!(lp.tick_config(), TimerConfig { prescaler: 9, interval: 48_828 });
        assert_eq!(lp.pwm_config(), TimerConfig { prescaler: 0, interval: 25_000 });
        assert_eq!(lp.match_value(), 15_750);
        assert_eq!(lp.tick_timer().prescaler(), 9);
        assert_eq!(lp.pwm_timer().interval(), 25_000);
        assert!(lp.pwm_timer().options().contains(TimerOptions::MATCH_MODE));
        assert!(lp.tick_timer().is_running() && lp.pwm_timer().is_running());

        assert_eq!(lp.poll().unwrap(), Progress::Idle);
        assert!(lp.tick_timer().elapse_interval());
        table.dispatch(board::TTC0_0_IRQ);
        assert_eq!(lp.poll().unwrap(), Progress::Acted);
        assert_eq!(console.lines(), vec!["Event!".to_string()]);
    }

    #[test]
    fn match_readback_mismatch_is_fatal() {
        let flag = EventFlag::new();
        let mut slot: Option<FlagHandler<'_, MockIrqLine>> = None;
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        let mut irq = InterruptManager::new(MockGic::new(), &table);

        let result = TripleTimerLoop::init(
            MockIntervalTimer::new(CLOCK),
            MockIntervalTimer::new(CLOCK).with_match_readback_skew(1),
            &mut irq,
            &flag,
            &mut slot,
            MockConsole::new(),
            TripleTimerConfig::default(),
        );
        assert_eq!(
            result.err(),
            Some(FatalReason::MatchReadback {
                expected: 15_750,
                actual: 15_751
            })
        );
        assert!(table.is_empty(), "nothing bound before validation passed");
    }

    #[test]
    fn unreachable_frequency_is_rejected_before_arming() {
        let flag = EventFlag::new();
        let mut slot: Option<FlagHandler<'_, MockIrqLine>> = None;
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        let mut irq = InterruptManager::new(MockGic::new(), &table);

        let result = TripleTimerLoop::init(
            MockIntervalTimer::new(CLOCK),
            MockIntervalTimer::new(CLOCK),
            &mut irq,
            &flag,
            &mut slot,
            MockConsole::new(),
            TripleTimerConfig {
                pwm_hz: CLOCK,
                ..TripleTimerConfig::default()
            },
        );
        assert!(matches!(
            result.err(),
            Some(FatalReason::InvalidFrequency(InvalidFrequency::TooHigh { .. }))
        ));
    }
}
