//! Watchdog loop on the desktop emulator.
//!
//! A button thread presses BTN8 every two simulated seconds, then stops.
//! The main thread advances the watchdog one simulated second per step
//! (100 ms of wall time), so the countdown expires five seconds after the
//! last press.
//!
//! ```bash
//! cargo run -p firmware --example watchdog_emulator --features emulator
//! ```

use std::time::Duration;

use control_core::dispatch::DispatchTable;
use control_core::fatal::halt;
use firmware::board;
use firmware::boot::{bring_up, interrupt_manager};
use firmware::emulator::{init_tracing, PendingProbe, Simulation, TracingConsole};
use firmware::loops::{
    ControlLoop, WatchdogFlags, WatchdogHandlerSlots, WatchdogLoop, WatchdogLoopConfig,
};
use platform::gpio::PinState;
use platform::mocks::{MockGic, MockGpio, MockGpioLine, MockIrqLine, MockWatchdog};
use platform::watchdog::WatchdogDevice;
use static_cell::StaticCell;

const STEP: Duration = Duration::from_millis(100);
const PRESSES: usize = 4;

static TABLE: DispatchTable<'static, { board::MAX_IRQ_BINDINGS }> = DispatchTable::new();
static FLAGS: WatchdogFlags = WatchdogFlags::new();
static SLOTS: StaticCell<WatchdogHandlerSlots<'static, MockGpioLine, MockIrqLine>> =
    StaticCell::new();

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
        let watchdog = bring_up::<MockWatchdog>(board::WATCHDOG_DEVICE)?;
        let gpio = bring_up::<MockGpio>(board::GPIO_DEVICE)?;
        let pins = gpio.handle();
        let lp = WatchdogLoop::init(
            watchdog,
            gpio,
            &mut irq,
            &FLAGS,
            SLOTS.init(WatchdogHandlerSlots::new()),
            TracingConsole,
            WatchdogLoopConfig::default(),
        )?;
        Ok::<_, control_core::fatal::FatalReason>((lp, pins))
    })();
    let (mut lp, pins) = match setup {
        Ok(parts) => parts,
        Err(reason) => halt(reason),
    };

    let mut sim = Simulation::new();
    let button_pending: PendingProbe = {
        let pins = pins.clone();
        Box::new(move || pins.is_latched(board::BUTTON_BTN8))
    };
    sim.gic(&TABLE, vec![(board::GPIO_IRQ, button_pending)]);
    let mut presses = 0usize;
    sim.peripheral(STEP.saturating_mul(2), move || {
        if presses < PRESSES {
            pins.drive_input(board::BUTTON_BTN8, PinState::High);
            std::thread::sleep(Duration::from_millis(5));
            pins.drive_input(board::BUTTON_BTN8, PinState::Low);
            presses = presses.saturating_add(1);
        }
    });
    irq.start();

    let ticks_per_second = lp.supervisor().device().input_clock_hz();
    let mut seconds = 0u32;
    loop {
        std::thread::sleep(STEP);
        if let Err(reason) = lp.poll() {
            halt(reason);
        }
        seconds = seconds.saturating_add(1);
        if lp.supervisor_mut().device_mut().advance(ticks_per_second) {
            break;
        }
    }

    let device = lp.supervisor().device();
    sim.shutdown();
    tracing::warn!(
        seconds,
        restarts = device.restarts(),
        resets = device.resets(),
        "watchdog reset the system"
    );
}
