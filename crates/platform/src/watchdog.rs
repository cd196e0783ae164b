//! System watchdog timer abstraction.
//!
//! The Zynq SWDT / Cortex-A9 private watchdog counts down from a loaded value
//! and, in watchdog mode, resets the system when it reaches zero. A reset
//! status latch survives the reset and tells the next boot what happened.

use crate::interrupt::InterruptAck;

/// Watchdog counter driver.
pub trait WatchdogDevice {
    /// Interrupt-context handle for the expiry interrupt.
    type Line: InterruptAck;

    /// Counter input clock in Hz.
    fn input_clock_hz(&self) -> u32;

    /// Switch the counter from timer mode to watchdog (reset) mode.
    fn set_watchdog_mode(&mut self);

    /// Load the countdown register.
    fn load(&mut self, ticks: u32);

    /// Start counting down.
    fn start(&mut self);

    /// Reload the counter from the load register ("pet").
    fn restart(&mut self);

    /// Read the "reset caused by watchdog" latch.
    ///
    /// Depending on the device the latch may clear itself on read.
    fn read_expired_latch(&mut self) -> bool;

    /// Let the counter raise its interrupt on expiry.
    fn enable_interrupt(&mut self);

    /// Handle for the expiry interrupt handler.
    fn line(&self) -> Self::Line;
}
