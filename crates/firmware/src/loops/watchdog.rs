//! Watchdog loop: report the boot cause, arm a 5 s watchdog, pet it on
//! every button press.
//!
//! Leave the button alone for the timeout and the system resets; the next
//! boot then prints `System had been reset due to Watchdog!`.

use control_core::dispatch::{FlagHandler, InterruptManager};
use control_core::event::EventFlag;
use control_core::fatal::FatalReason;
use control_core::watchdog::{WatchdogSupervisor, WatchdogTimeout};
use platform::console::Console;
use platform::gpio::{Direction, EdgeQualifier, GpioBank, InterruptMode, PinId};
use platform::interrupt::{InterruptController, IrqSource};
use platform::watchdog::WatchdogDevice;

use super::{ControlLoop, Progress};
use crate::board;

/// Flags raised by the button and (optionally) the expiry interrupt.
#[derive(Debug, Default)]
pub struct WatchdogFlags {
    /// Button rising edge, debounced by level
    pub button: EventFlag,
    /// Watchdog expiry telemetry
    pub expired: EventFlag,
}

impl WatchdogFlags {
    /// Both lowered. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            button: EventFlag::new(),
            expired: EventFlag::new(),
        }
    }
}

/// Storage for the button and expiry handlers.
pub struct WatchdogHandlerSlots<'a, B, E> {
    /// Button handler
    pub button: Option<FlagHandler<'a, B>>,
    /// Expiry telemetry handler
    pub expiry: Option<FlagHandler<'a, E>>,
}

impl<B, E> WatchdogHandlerSlots<'_, B, E> {
    /// Both empty. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            button: None,
            expiry: None,
        }
    }
}

impl<B, E> Default for WatchdogHandlerSlots<'_, B, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Watchdog loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogLoopConfig {
    /// Countdown length
    pub timeout_secs: u32,
    /// Pet button
    pub button: PinId,
    /// GPIO bank interrupt
    pub button_irq: IrqSource,
    /// Watchdog interrupt
    pub watchdog_irq: IrqSource,
    /// Bind a handler that prints when the countdown expires. The reset
    /// follows regardless; off by default.
    pub expiry_telemetry: bool,
}

impl Default for WatchdogLoopConfig {
    fn default() -> Self {
        Self {
            timeout_secs: board::WATCHDOG_TIMEOUT_SECS,
            button: board::BUTTON_BTN8,
            button_irq: board::GPIO_IRQ,
            watchdog_irq: board::WATCHDOG_IRQ,
            expiry_telemetry: false,
        }
    }
}

/// Button-petted watchdog.
pub struct WatchdogLoop<'a, D, G, W> {
    supervisor: WatchdogSupervisor<D>,
    gpio: G,
    flags: &'a WatchdogFlags,
    console: W,
}

impl<'a, D, G, W> WatchdogLoop<'a, D, G, W>
where
    D: WatchdogDevice,
    D::Line: 'a,
    G: GpioBank,
    G::Line: 'a,
    W: Console,
{
    /// Read the boot cause, wire the button, arm the countdown.
    #[allow(clippy::too_many_arguments)]
    pub fn init<C: InterruptController, const N: usize>(
        device: D,
        mut gpio: G,
        irq: &mut InterruptManager<'_, 'a, C, N>,
        flags: &'a WatchdogFlags,
        slots: &'a mut WatchdogHandlerSlots<'a, G::Line, D::Line>,
        mut console: W,
        config: WatchdogLoopConfig,
    ) -> Result<Self, FatalReason> {
        let mut supervisor = WatchdogSupervisor::new(device);
        if supervisor.read_expired_on_boot() {
            console.write_line("System had been reset due to Watchdog!");
        } else {
            console.write_line("System powered up normally..");
        }

        gpio.set_direction(config.button, Direction::Input);
        gpio.set_interrupt_mode(config.button, InterruptMode::RisingEdge);
        let button: &'a FlagHandler<'a, G::Line> = slots.button.insert(FlagHandler::new(
            gpio.line(config.button, EdgeQualifier::LevelHigh),
            &flags.button,
        ));
        irq.bind(config.button_irq, button)?;
        gpio.enable_interrupt(config.button);
        irq.enable(config.button_irq)?;

        if config.expiry_telemetry {
            let line = supervisor.enable_expiry_interrupt()?;
            let expiry: &'a FlagHandler<'a, D::Line> =
                slots.expiry.insert(FlagHandler::new(line, &flags.expired));
            irq.bind(config.watchdog_irq, expiry)?;
            irq.enable(config.watchdog_irq)?;
        }

        let timeout =
            WatchdogTimeout::from_secs(supervisor.device().input_clock_hz(), config.timeout_secs)?;
        supervisor.arm(timeout)?;

        Ok(Self {
            supervisor,
            gpio,
            flags,
            console,
        })
    }

    /// The supervisor.
    pub fn supervisor(&self) -> &WatchdogSupervisor<D> {
        &self.supervisor
    }

    /// The supervisor, mutably.
    pub fn supervisor_mut(&mut self) -> &mut WatchdogSupervisor<D> {
        &mut self.supervisor
    }

    /// The GPIO driver.
    pub fn gpio(&self) -> &G {
        &self.gpio
    }
}

impl<D, G, W> ControlLoop for WatchdogLoop<'_, D, G, W>
where
    D: WatchdogDevice,
    G: GpioBank,
    W: Console,
{
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        let mut progress = Progress::Idle;
        if self.flags.expired.take() {
            self.console.write_line("Watchdog expired!");
            progress = Progress::Acted;
        }
        if self.flags.button.take() {
            self.supervisor.restart()?;
            self.console.write_line("Button pressed!");
            progress = Progress::Acted;
        }
        Ok(progress)
    }
}
