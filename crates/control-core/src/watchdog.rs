//! Watchdog supervisor.
//!
//! Order of operations is enforced: the boot status (did the previous run
//! end in a watchdog reset?) is read first, because on some devices reading
//! or restarting clears the latch. Only then may the countdown be armed and
//! petted.
//!
//! Expiry itself is not an error this module can report. The device resets
//! the system; the next boot sees it through
//! [`WatchdogSupervisor::read_expired_on_boot`].

use platform::watchdog::WatchdogDevice;
use thiserror::Error;

/// Watchdog supervisor errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogError {
    /// The boot status must be read before anything else.
    #[error("boot status not read yet")]
    BootStatusUnread,
    /// A zero timeout would reset immediately.
    #[error("watchdog timeout is zero")]
    ZeroTimeout,
    /// `restart` before `arm`.
    #[error("watchdog not armed")]
    NotArmed,
    /// The timeout does not fit the 32-bit load register.
    #[error("watchdog timeout too long for the counter")]
    TimeoutTooLong,
}

/// Countdown length in counter ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchdogTimeout(u32);

impl WatchdogTimeout {
    /// `ticks` counter ticks.
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks)
    }

    /// `secs` seconds of a counter clocked at `clock_hz`.
    pub fn from_secs(clock_hz: u32, secs: u32) -> Result<Self, WatchdogError> {
        clock_hz
            .checked_mul(secs)
            .map(Self)
            .ok_or(WatchdogError::TimeoutTooLong)
    }

    /// Tick count for the load register.
    pub const fn ticks(self) -> u32 {
        self.0
    }
}

/// Supervisor bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchdogState {
    /// Loaded countdown, 0 until armed
    pub timeout_ticks: u32,
    /// Boot status from the first read
    pub expired_on_boot: bool,
    /// Whether the countdown is running
    pub armed: bool,
}

/// Watchdog device plus the boot-status / arm / pet protocol.
pub struct WatchdogSupervisor<D> {
    device: D,
    state: WatchdogState,
    boot_status_read: bool,
}

impl<D: WatchdogDevice> WatchdogSupervisor<D> {
    /// Wrap an initialized, self-tested device.
    pub fn new(device: D) -> Self {
        Self {
            device,
            state: WatchdogState::default(),
            boot_status_read: false,
        }
    }

    /// Whether the previous run ended in a watchdog reset.
    ///
    /// Call once, first. The first result is kept in
    /// [`WatchdogState::expired_on_boot`]. Later calls read the device again
    /// and so may return `false` on a clear-on-read latch.
    pub fn read_expired_on_boot(&mut self) -> bool {
        let expired = self.device.read_expired_latch();
        if self.boot_status_read {
            #[cfg(feature = "defmt")]
            defmt::warn!("watchdog boot status read twice; latch may already be clear");
            #[cfg(feature = "tracing")]
            tracing::warn!(
                expired,
                first = self.state.expired_on_boot,
                "watchdog boot status read twice"
            );
            return expired;
        }
        self.boot_status_read = true;
        self.state.expired_on_boot = expired;
        #[cfg(feature = "defmt")]
        defmt::info!("watchdog boot status: expired={}", expired);
        #[cfg(feature = "tracing")]
        tracing::info!(expired, "watchdog boot status");
        expired
    }

    /// Boot status from the first read, `None` before it.
    pub fn expired_on_boot(&self) -> Option<bool> {
        self.boot_status_read.then_some(self.state.expired_on_boot)
    }

    /// Switch to reset mode, load `timeout` and start counting.
    pub fn arm(&mut self, timeout: WatchdogTimeout) -> Result<(), WatchdogError> {
        self.require_boot_status()?;
        if timeout.ticks() == 0 {
            return Err(WatchdogError::ZeroTimeout);
        }
        self.device.set_watchdog_mode();
        self.device.load(timeout.ticks());
        self.device.start();
        self.state.timeout_ticks = timeout.ticks();
        self.state.armed = true;
        #[cfg(feature = "tracing")]
        tracing::info!(ticks = timeout.ticks(), "watchdog armed");
        Ok(())
    }

    /// Reload the countdown ("pet").
    pub fn restart(&mut self) -> Result<(), WatchdogError> {
        self.require_boot_status()?;
        if !self.state.armed {
            return Err(WatchdogError::NotArmed);
        }
        self.device.restart();
        Ok(())
    }

    /// Enable the expiry interrupt and return its line for a telemetry
    /// handler. Best effort: the reset follows regardless.
    pub fn enable_expiry_interrupt(&mut self) -> Result<D::Line, WatchdogError> {
        self.require_boot_status()?;
        self.device.enable_interrupt();
        Ok(self.device.line())
    }

    fn require_boot_status(&self) -> Result<(), WatchdogError> {
        if self.boot_status_read {
            Ok(())
        } else {
            Err(WatchdogError::BootStatusUnread)
        }
    }

    /// Current bookkeeping.
    pub fn state(&self) -> WatchdogState {
        self.state
    }

    /// The device driver.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The device driver, mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::{LatchBehavior, MockWatchdog};

    fn supervisor(behavior: LatchBehavior) -> WatchdogSupervisor<MockWatchdog> {
        WatchdogSupervisor::new(MockWatchdog::new(1_000, behavior))
    }

    #[test]
    fn everything_waits_for_the_boot_status() {
        let mut wdt = supervisor(LatchBehavior::Sticky);
        assert_eq!(
            wdt.arm(WatchdogTimeout::from_ticks(100)),
            Err(WatchdogError::BootStatusUnread)
        );
        assert_eq!(wdt.restart(), Err(WatchdogError::BootStatusUnread));
        assert!(wdt.enable_expiry_interrupt().is_err());
        assert_eq!(wdt.expired_on_boot(), None);
    }

    #[test]
    fn clear_on_read_latch_is_not_reported_twice() {
        let mut wdt = WatchdogSupervisor::new(
            MockWatchdog::new(1_000, LatchBehavior::ClearOnRead).with_expired_latch(),
        );
        assert!(wdt.read_expired_on_boot());
        assert!(!wdt.read_expired_on_boot());
        assert_eq!(wdt.expired_on_boot(), Some(true), "first read is cached");
    }

    #[test]
    fn sticky_latch_reads_true_every_time() {
        let mut wdt = WatchdogSupervisor::new(
            MockWatchdog::new(1_000, LatchBehavior::Sticky).with_expired_latch(),
        );
        assert!(wdt.read_expired_on_boot());
        assert!(wdt.read_expired_on_boot());
    }

    #[test]
    fn arm_loads_and_starts_in_reset_mode() {
        let mut wdt = supervisor(LatchBehavior::Sticky);
        assert!(!wdt.read_expired_on_boot());
        wdt.arm(WatchdogTimeout::from_ticks(500)).unwrap();
        assert!(wdt.device().is_watchdog_mode());
        assert!(wdt.device().is_running());
        assert_eq!(wdt.device().remaining(), 500);
        assert_eq!(
            wdt.state(),
            WatchdogState {
                timeout_ticks: 500,
                expired_on_boot: false,
                armed: true
            }
        );
    }

    #[test]
    fn zero_timeout_and_unarmed_restart_are_rejected() {
        let mut wdt = supervisor(LatchBehavior::Sticky);
        wdt.read_expired_on_boot();
        assert_eq!(wdt.restart(), Err(WatchdogError::NotArmed));
        assert_eq!(
            wdt.arm(WatchdogTimeout::from_ticks(0)),
            Err(WatchdogError::ZeroTimeout)
        );
    }

    #[test]
    fn petting_faster_than_the_timeout_never_expires() {
        let mut wdt = supervisor(LatchBehavior::Sticky);
        wdt.read_expired_on_boot();
        wdt.arm(WatchdogTimeout::from_ticks(100)).unwrap();
        for _ in 0..1_000 {
            assert!(!wdt.device_mut().advance(99));
            wdt.restart().unwrap();
        }
        assert_eq!(wdt.device().resets(), 0);
    }

    #[test]
    fn petting_slower_than_the_timeout_resets() {
        let mut wdt = supervisor(LatchBehavior::Sticky);
        wdt.read_expired_on_boot();
        wdt.arm(WatchdogTimeout::from_ticks(100)).unwrap();
        assert!(wdt.device_mut().advance(101));
        assert_eq!(wdt.device().resets(), 1);
        assert!(wdt.device_mut().read_expired_latch());
    }

    #[test]
    fn expiry_interrupt_pends_its_line() {
        use platform::interrupt::InterruptAck;
        let mut wdt = supervisor(LatchBehavior::Sticky);
        wdt.read_expired_on_boot();
        let line = wdt.enable_expiry_interrupt().unwrap();
        wdt.arm(WatchdogTimeout::from_ticks(10)).unwrap();
        wdt.device_mut().advance(10);
        assert!(line.acknowledge());
    }

    #[test]
    fn timeout_from_seconds() {
        assert_eq!(WatchdogTimeout::from_secs(1_000, 5).unwrap().ticks(), 5_000);
        assert_eq!(
            WatchdogTimeout::from_secs(u32::MAX, 2),
            Err(WatchdogError::TimeoutTooLong)
        );
    }
}
