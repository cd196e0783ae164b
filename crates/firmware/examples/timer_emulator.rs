//! Private timer and triple timer counter loops on the desktop emulator.
//!
//! Peripheral threads expire the timers (compressed time: 100 ms per
//! simulated second); a GIC thread dispatches their interrupts.
//!
//! ```bash
//! cargo run -p firmware --example timer_emulator --features emulator
//! ```

use std::time::Duration;

use control_core::dispatch::{DispatchTable, FlagHandler, RearmingHandler};
use control_core::event::EventFlag;
use control_core::fatal::halt;
use firmware::board;
use firmware::boot::{bring_up, interrupt_manager};
use firmware::emulator::{init_tracing, PendingProbe, Simulation, TracingConsole};
use firmware::loops::{
    ControlLoop, PrivateTimerConfig, PrivateTimerLoop, Progress, TripleTimerConfig,
    TripleTimerLoop,
};
use platform::mocks::{MockGic, MockIntervalTimer, MockIrqLine, MockPrivateTimer};
use platform::timer::{IntervalTimer, OneShotTimer, TimerIrq};
use static_cell::StaticCell;

const TICKS: usize = 5;

static TABLE: DispatchTable<'static, { board::MAX_IRQ_BINDINGS }> = DispatchTable::new();
static PRIVATE_FLAG: EventFlag = EventFlag::new();
static TTC_FLAG: EventFlag = EventFlag::new();
static PRIVATE_SLOT: StaticCell<Option<RearmingHandler<'static, MockIrqLine>>> = StaticCell::new();
static TTC_SLOT: StaticCell<Option<FlagHandler<'static, MockIrqLine>>> = StaticCell::new();

fn main() {
    init_tracing();
    tracing::info!("{}", platform::config::boot_banner());

    let mut irq = match interrupt_manager::<MockGic, { board::MAX_IRQ_BINDINGS }>(
        board::GIC_DEVICE,
        &TABLE,
    ) {
        Ok(irq) => irq,
        Err(reason) => halt(reason),
    };
    let setup = (|| {
        let private = bring_up::<MockPrivateTimer>(board::PRIVATE_TIMER_DEVICE)?;
        let tick = bring_up::<MockIntervalTimer>(board::TTC0_DEVICE)?;
        let pwm = bring_up::<MockIntervalTimer>(board::TTC1_DEVICE)?;
        let private_line = private.line();
        let tick_line = tick.line(TimerIrq::INTERVAL);

        let private_loop = PrivateTimerLoop::init(
            private,
            &mut irq,
            &PRIVATE_FLAG,
            PRIVATE_SLOT.init(None),
            TracingConsole,
            PrivateTimerConfig::default(),
        )?;
        let ttc_loop = TripleTimerLoop::init(
            tick,
            pwm,
            &mut irq,
            &TTC_FLAG,
            TTC_SLOT.init(None),
            TracingConsole,
            TripleTimerConfig::default(),
        )?;
        Ok::<_, control_core::fatal::FatalReason>((private_loop, ttc_loop, private_line, tick_line))
    })();
    let (mut private_loop, mut ttc_loop, private_line, tick_line) = match setup {
        Ok(parts) => parts,
        Err(reason) => halt(reason),
    };
    tracing::info!(
        reload_ticks = private_loop.reload_ticks(),
        ttc_prescaler = ttc_loop.tick_config().prescaler,
        ttc_interval = ttc_loop.tick_config().interval,
        pwm_match = ttc_loop.match_value(),
        "timers armed"
    );

    let mut sim = Simulation::new();
    let private_pending: PendingProbe = {
        let line = private_line.clone();
        Box::new(move || line.is_pending())
    };
    let tick_pending: PendingProbe = {
        let line = tick_line.clone();
        Box::new(move || line.is_pending())
    };
    sim.gic(
        &TABLE,
        vec![
            (board::PRIVATE_TIMER_IRQ, private_pending),
            (board::TTC0_0_IRQ, tick_pending),
        ],
    );
    sim.peripheral(Duration::from_millis(100), move || private_line.pend());
    sim.peripheral(Duration::from_millis(100), move || tick_line.pend());
    irq.start();

    let (mut private_ticks, mut ttc_ticks) = (0usize, 0usize);
    while private_ticks < TICKS || ttc_ticks < TICKS {
        for (lp, count) in [
            (&mut private_loop as &mut dyn ControlLoop, &mut private_ticks),
            (&mut ttc_loop as &mut dyn ControlLoop, &mut ttc_ticks),
        ] {
            match lp.poll() {
                Ok(Progress::Acted) => *count = count.saturating_add(1),
                Ok(Progress::Idle) => std::thread::yield_now(),
                Err(reason) => halt(reason),
            }
        }
    }

    let dispatched = sim.dispatched();
    sim.shutdown();
    tracing::info!(private_ticks, ttc_ticks, dispatched, "done");
}
