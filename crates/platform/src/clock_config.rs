//! Clock configuration for the Zynq-7000 PS on the Zedboard.
//!
//! Encodes which peripheral counts from which clock domain, so timer tick
//! counts are always derived from the right input frequency.
//!
//! # Background
//!
//! The Cortex-A9 private timer and private watchdog are clocked by
//! CPU_3x2x, which is half the CPU clock. The triple timer counters sit on
//! the APB and count CPU_1x. Deriving a one-second tick count from the CPU
//! clock instead of the peripheral clock gives a timer twice (or six times)
//! too slow, with no error anywhere.
//!
//! # Sources
//!
//! - Zynq-7000 TRM (UG585) §25.2 "CPU Clock" (6:2:1 ratio)
//! - UG585 §8.2 "CPU Private Timers and Watchdog Timers"
//! - UG585 §8.5 "Triple Timer Counters"

/// CPU_3x2x: private timer, private watchdog, SCU. Half the 666.67 MHz
/// core clock.
pub const CPU_3X2X_CLOCK_HZ: u32 = 333_333_343;

/// CPU_1x: APB peripherals (TTC, GPIO, UART, SWDT). A sixth of the core
/// clock.
pub const CPU_1X_CLOCK_HZ: u32 = 111_111_115;

#[cfg(test)]
mod tests {
    use super::*;

    /// The 6:2:1 ratio: the private timer counts three times as fast as a TTC.
    #[test]
    fn private_timer_clock_is_three_apb_clocks() {
        assert!(CPU_1X_CLOCK_HZ.saturating_mul(3).abs_diff(CPU_3X2X_CLOCK_HZ) <= 3);
    }
}
