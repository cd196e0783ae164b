//! Timing parameter solver: target frequency → (prescaler, interval), and
//! duty cycle → match value.
//!
//! The counter sees `input_clock_hz / 2^(prescaler + 1)` and wraps every
//! `interval` ticks. Both values are integers, so the reproduced frequency
//! is a stepped approximation of the target; callers must tolerate the
//! error. The smallest workable prescaler wins, because it leaves the
//! largest interval and therefore the finest PWM resolution.
//!
//! Everything here is pure arithmetic and runs before any hardware is
//! touched: an `Err` means "do not arm the timer".

use platform::timer::IntervalTimer;
use thiserror::Error;

/// Prescaler limit of the triple timer counter's 4-bit prescaler field.
pub const DEFAULT_MAX_PRESCALER: u8 = 15;

/// Smallest usable interval. A counter that wraps every tick produces no
/// waveform and leaves no room for a match value.
pub const MIN_INTERVAL: u64 = 2;

/// Supported counter widths in bits.
pub const COUNTER_WIDTHS: core::ops::RangeInclusive<u32> = 2..=32;

/// Solver input for one periodic timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerSpec {
    /// Requested output frequency
    pub target_frequency_hz: u32,
    /// Counter input clock before the prescaler
    pub input_clock_hz: u32,
    /// Counter register width
    pub counter_width_bits: u32,
    /// Largest prescaler the device accepts
    pub max_prescaler: u8,
}

impl TimerSpec {
    /// Spec with the default prescaler limit.
    pub const fn new(target_frequency_hz: u32, input_clock_hz: u32, counter_width_bits: u32) -> Self {
        Self {
            target_frequency_hz,
            input_clock_hz,
            counter_width_bits,
            max_prescaler: DEFAULT_MAX_PRESCALER,
        }
    }

    /// Spec for `timer`'s input clock and counter width.
    pub fn for_timer<T: IntervalTimer>(timer: &T, target_frequency_hz: u32) -> Self {
        Self::new(
            target_frequency_hz,
            timer.input_clock_hz(),
            timer.counter_width_bits(),
        )
    }

    /// Override the prescaler limit.
    #[must_use]
    pub const fn with_max_prescaler(mut self, max_prescaler: u8) -> Self {
        self.max_prescaler = max_prescaler;
        self
    }
}

/// Solver output: values for the prescaler and interval registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    /// Clock divided by `2^(prescaler + 1)`
    pub prescaler: u8,
    /// Counter wrap value
    pub interval: u32,
}

impl TimerConfig {
    /// Clock seen by the counter, in Hz (fractional).
    #[allow(clippy::arithmetic_side_effects)] // float division, divisor >= 2
    pub fn scaled_clock_hz(&self, input_clock_hz: u32) -> f64 {
        f64::from(input_clock_hz) / pow2(u32::from(self.prescaler).saturating_add(1))
    }

    /// Frequency this configuration actually produces.
    #[allow(clippy::arithmetic_side_effects)] // float division; interval 0 yields inf
    pub fn output_frequency_hz(&self, input_clock_hz: u32) -> f64 {
        self.scaled_clock_hz(input_clock_hz) / f64::from(self.interval)
    }
}

#[allow(clippy::arithmetic_side_effects)] // float doubling
fn pow2(exp: u32) -> f64 {
    let mut value = 1.0;
    for _ in 0..exp {
        value *= 2.0;
    }
    value
}

/// Why no timer configuration exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidFrequency {
    /// A target of 0 Hz.
    #[error("target frequency is zero")]
    ZeroTarget,
    /// An input clock of 0 Hz.
    #[error("input clock is zero")]
    ZeroInputClock,
    /// Counter width outside [`COUNTER_WIDTHS`].
    #[error("unsupported counter width {0} bits")]
    InvalidCounterWidth(u32),
    /// The target is too close to the input clock for any interval.
    #[error("{target_hz} Hz is too high for a {input_clock_hz} Hz input clock")]
    TooHigh {
        /// Requested frequency
        target_hz: u32,
        /// Counter input clock
        input_clock_hz: u32,
    },
    /// Even the largest prescaler leaves an interval wider than the counter.
    #[error("{target_hz} Hz is too low for prescalers up to {max_prescaler}")]
    TooLow {
        /// Requested frequency
        target_hz: u32,
        /// Largest prescaler tried
        max_prescaler: u8,
    },
}

/// Derive the smallest prescaler, and its interval, that reproduce
/// `spec.target_frequency_hz` within the counter width.
///
/// Intervals are computed by truncating division,
/// `input_clock_hz / 2^(prescaler + 1) / target_frequency_hz`.
pub fn solve_timer(spec: TimerSpec) -> Result<TimerConfig, InvalidFrequency> {
    if spec.target_frequency_hz == 0 {
        return Err(InvalidFrequency::ZeroTarget);
    }
    if spec.input_clock_hz == 0 {
        return Err(InvalidFrequency::ZeroInputClock);
    }
    if !COUNTER_WIDTHS.contains(&spec.counter_width_bits) {
        return Err(InvalidFrequency::InvalidCounterWidth(spec.counter_width_bits));
    }

    let max_interval = u64::MAX >> (64u32.saturating_sub(spec.counter_width_bits));
    let input = u64::from(spec.input_clock_hz);
    let target = u64::from(spec.target_frequency_hz);

    for prescaler in 0..=spec.max_prescaler {
        let Some(divisor) = 1u64.checked_shl(u32::from(prescaler).saturating_add(1)) else {
            break;
        };
        #[allow(clippy::arithmetic_side_effects)] // divisor >= 2, target checked non-zero
        let interval = input / divisor / target;
        if interval < MIN_INTERVAL {
            // Larger prescalers only shrink the interval further.
            return Err(InvalidFrequency::TooHigh {
                target_hz: spec.target_frequency_hz,
                input_clock_hz: spec.input_clock_hz,
            });
        }
        if interval <= max_interval {
            let interval = u32::try_from(interval).map_err(|_| InvalidFrequency::TooLow {
                target_hz: spec.target_frequency_hz,
                max_prescaler: spec.max_prescaler,
            })?;
            return Ok(TimerConfig {
                prescaler,
                interval,
            });
        }
    }

    Err(InvalidFrequency::TooLow {
        target_hz: spec.target_frequency_hz,
        max_prescaler: spec.max_prescaler,
    })
}

/// Solver input for a PWM match value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmSpec {
    /// Interval the counter runs with
    pub interval: u32,
    /// Fraction of the period, `0.0..=1.0`
    pub duty_cycle: f32,
}

/// Why no match value exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidDutyCycle {
    /// Interval of zero.
    #[error("interval is zero")]
    ZeroInterval,
    /// Duty cycle outside `0.0..=1.0`, or NaN.
    #[error("duty cycle outside 0.0..=1.0")]
    OutOfRange,
    /// The match value rounds to zero and would produce no waveform.
    #[error("match value rounds to zero")]
    RoundsToZero,
}

/// Match value `round(interval × duty_cycle)`, rounding halves up.
pub fn solve_pwm(spec: PwmSpec) -> Result<u32, InvalidDutyCycle> {
    if spec.interval == 0 {
        return Err(InvalidDutyCycle::ZeroInterval);
    }
    if !(0.0..=1.0).contains(&spec.duty_cycle) {
        return Err(InvalidDutyCycle::OutOfRange);
    }
    #[allow(clippy::arithmetic_side_effects)] // float product of finite values
    let exact = f64::from(spec.interval) * f64::from(spec.duty_cycle);
    // Non-negative and at most `interval`, so truncation is a floor that
    // fits in u32.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::arithmetic_side_effects
    )]
    let match_value = (exact + 0.5) as u32;
    if match_value == 0 {
        return Err(InvalidDutyCycle::RoundsToZero);
    }
    Ok(match_value.min(spec.interval))
}
