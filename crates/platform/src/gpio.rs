//! GPIO abstractions
//!
//! Two kinds of parallel I/O appear on the board:
//!
//! - [`GpioBank`]: the PS GPIO controller (MIO/EMIO pins), addressed pin by
//!   pin, with per-pin edge interrupts.
//! - [`PinGroup`]: an AXI GPIO block in programmable logic, read and written
//!   as a whole word (switch banks, LED banks).

use crate::interrupt::InterruptAck;

/// PS GPIO pin number (MIO 0..=53, EMIO 54..=117).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(pub u8);

/// Pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

impl PinState {
    /// `"HIGH"` or `"LOW"`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Low => "LOW",
        }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Input
    Input,
    /// Output
    Output,
}

/// External interrupt configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptMode {
    /// Trigger on rising edge
    RisingEdge,
    /// Trigger on falling edge
    FallingEdge,
    /// Trigger on both edges
    BothEdges,
}

/// What the interrupt handler requires of a pin before it counts an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeQualifier {
    /// Every latched edge counts.
    Any,
    /// The edge counts only if the pin still reads high (debounce for
    /// mechanical buttons).
    LevelHigh,
}

/// PS GPIO controller.
pub trait GpioBank {
    /// Interrupt-context handle for one pin's edge interrupt.
    type Line: InterruptAck;

    /// Set a pin's direction.
    fn set_direction(&mut self, pin: PinId, direction: Direction);

    /// Enable or disable a pin's output driver.
    fn set_output_enable(&mut self, pin: PinId, enabled: bool);

    /// Drive an output pin.
    fn write_pin(&mut self, pin: PinId, state: PinState);

    /// Sample a pin.
    fn read_pin(&self, pin: PinId) -> PinState;

    /// Select which edge latches the pin's interrupt.
    fn set_interrupt_mode(&mut self, pin: PinId, mode: InterruptMode);

    /// Unmask the pin's interrupt.
    fn enable_interrupt(&mut self, pin: PinId);

    /// Handle for the pin's interrupt handler; `acknowledge` clears the
    /// pin's latched status and applies `qualifier`.
    fn line(&self, pin: PinId, qualifier: EdgeQualifier) -> Self::Line;
}

/// Pin group for efficient multi-pin operations
pub trait PinGroup {
    /// Error type
    type Error;

    /// Read all pins at once
    fn read(&self) -> Result<u32, Self::Error>;

    /// Write all pins at once
    fn write(&mut self, value: u32) -> Result<(), Self::Error>;

    /// Set specific pins high
    fn set_high(&mut self, mask: u32) -> Result<(), Self::Error>;

    /// Set specific pins low
    fn set_low(&mut self, mask: u32) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_state_round_trips_through_bool() {
        assert_eq!(PinState::from(true), PinState::High);
        assert!(!bool::from(PinState::Low));
        assert_eq!(PinState::High.as_str(), "HIGH");
    }
}
