//! Timer abstractions: the per-core private timer and the triple timer counter.
//!
//! Two shapes of hardware timer appear on the Zynq PS:
//!
//! - [`OneShotTimer`]: the Cortex-A9 private timer. Loaded with a tick count,
//!   counts down once, raises its interrupt and stops. Periodic behavior is
//!   obtained by re-arming from the interrupt handler ([`OneShotRearm`]).
//! - [`IntervalTimer`]: one counter of a triple timer counter (TTC). Counts
//!   up to an interval through a prescaler, optionally toggling a waveform
//!   output at a match value.

use bitflags::bitflags;

use crate::interrupt::InterruptAck;

bitflags! {
    /// Counter operating options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerOptions: u32 {
        /// Count up to the interval register and wrap.
        const INTERVAL_MODE = 1 << 0;
        /// Compare against the match registers.
        const MATCH_MODE = 1 << 1;
        /// Count down instead of up.
        const DECREMENT = 1 << 2;
        /// Disable the waveform output pin.
        const WAVE_DISABLE = 1 << 3;
        /// Invert the waveform output polarity.
        const WAVE_POLARITY = 1 << 4;
        /// Clock the counter from the external clock pin.
        const EXTERNAL_CLOCK = 1 << 5;
    }
}

bitflags! {
    /// Interrupt status / enable bits of one counter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerIrq: u32 {
        /// Counter reached the interval value.
        const INTERVAL = 0x01;
        /// Counter matched match register 0.
        const MATCH_0 = 0x02;
        /// Counter matched match register 1.
        const MATCH_1 = 0x04;
        /// Counter matched match register 2.
        const MATCH_2 = 0x08;
        /// Counter overflowed.
        const OVERFLOW = 0x10;
        /// Event timer overflowed.
        const EVENT = 0x20;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TimerIrq {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "TimerIrq({=u32:#x})", self.bits());
    }
}

/// Match register selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MatchChannel {
    /// Match register 0
    Zero,
    /// Match register 1
    One,
    /// Match register 2
    Two,
}

impl MatchChannel {
    /// Register index (0..=2).
    pub const fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Interrupt-context handle that restarts a one-shot timer.
pub trait OneShotRearm: Sync {
    /// Reload the counter with `ticks` and start it.
    fn rearm(&self, ticks: u32);
}

impl<T: OneShotRearm + ?Sized> OneShotRearm for &T {
    fn rearm(&self, ticks: u32) {
        (**self).rearm(ticks);
    }
}

/// One-shot countdown timer (Cortex-A9 private timer).
pub trait OneShotTimer {
    /// Interrupt-context handle for acknowledging and re-arming.
    type Line: InterruptAck + OneShotRearm;

    /// Counter input clock in Hz.
    fn input_clock_hz(&self) -> u32;

    /// Load the countdown register.
    fn load(&mut self, ticks: u32);

    /// Start counting down from the loaded value.
    fn start(&mut self);

    /// Let the timer raise its interrupt on expiry.
    fn enable_interrupt(&mut self);

    /// Handle for the interrupt handler.
    fn line(&self) -> Self::Line;
}

/// Interval / PWM counter (one counter of a triple timer counter).
pub trait IntervalTimer {
    /// Interrupt-context handle that clears the status register.
    type Line: InterruptAck;

    /// Counter input clock in Hz (before the prescaler).
    fn input_clock_hz(&self) -> u32;

    /// Width of the counter register in bits.
    fn counter_width_bits(&self) -> u32;

    /// Replace the counter's option set.
    fn set_options(&mut self, options: TimerOptions);

    /// Program the interval register.
    fn set_interval(&mut self, interval: u32);

    /// Program the prescaler; the input clock is divided by `2^(prescaler+1)`.
    fn set_prescaler(&mut self, prescaler: u8);

    /// Program a match register.
    fn set_match_value(&mut self, channel: MatchChannel, value: u32);

    /// Read a match register back.
    fn match_value(&self, channel: MatchChannel) -> u32;

    /// Enable the interrupts in `mask`.
    fn enable_interrupts(&mut self, mask: TimerIrq);

    /// Start counting.
    fn start(&mut self);

    /// Handle for the interrupt handler; `acknowledge` reports whether any
    /// bit of `mask` was set in the (clear-on-read) status register.
    fn line(&self, mask: TimerIrq) -> Self::Line;
}
