//! On-chip analog system monitor (XADC) abstraction and code conversions.
//!
//! The XADC digitizes die temperature, the internal supply rails, and one
//! dedicated differential input (VP/VN). Conversion results are 12 bits,
//! left-justified in a 16-bit status register.

use bitflags::bitflags;
use thiserror::Error;

/// Full-scale input range of the supply channels, in volts.
pub const SUPPLY_FULL_SCALE_VOLTS: f32 = 3.0;

/// Number of codes of the 12-bit converter.
pub const ADC_CODES: f32 = 4096.0;

/// Temperature transfer function slope numerator (UG480 equation 2-1).
pub const TEMP_SCALE: f32 = 503.975;

/// Kelvin to Celsius offset.
pub const KELVIN_OFFSET: f32 = 273.15;

/// Monitored channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcChannel {
    /// Die temperature
    Temperature,
    /// PL internal supply
    VccInt,
    /// PL auxiliary supply
    VccAux,
    /// Dedicated differential analog input
    VpVn,
    /// PL block RAM supply
    VBram,
    /// PS internal supply
    VccPInt,
    /// PS auxiliary supply
    VccPAux,
    /// PS DDR I/O supply
    VccPDdr,
}

bitflags! {
    /// Channel sequencer enable mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SequenceChannels: u32 {
        /// Die temperature
        const TEMPERATURE = 1 << 8;
        /// PL internal supply
        const VCC_INT = 1 << 9;
        /// PL auxiliary supply
        const VCC_AUX = 1 << 10;
        /// Dedicated VP/VN input
        const VP_VN = 1 << 11;
        /// PL block RAM supply
        const V_BRAM = 1 << 14;
        /// PS internal supply
        const VCC_P_INT = 1 << 5;
        /// PS auxiliary supply
        const VCC_P_AUX = 1 << 6;
        /// PS DDR I/O supply
        const VCC_P_DDR = 1 << 7;
    }
}

impl AdcChannel {
    /// Every channel, in read-out order.
    pub const ALL: [AdcChannel; 8] = [
        Self::Temperature,
        Self::VccInt,
        Self::VccAux,
        Self::VBram,
        Self::VccPDdr,
        Self::VccPInt,
        Self::VccPAux,
        Self::VpVn,
    ];

    /// This channel's bit in the sequencer enable mask.
    pub const fn sequence_bit(self) -> SequenceChannels {
        match self {
            Self::Temperature => SequenceChannels::TEMPERATURE,
            Self::VccInt => SequenceChannels::VCC_INT,
            Self::VccAux => SequenceChannels::VCC_AUX,
            Self::VpVn => SequenceChannels::VP_VN,
            Self::VBram => SequenceChannels::V_BRAM,
            Self::VccPInt => SequenceChannels::VCC_P_INT,
            Self::VccPAux => SequenceChannels::VCC_P_AUX,
            Self::VccPDdr => SequenceChannels::VCC_P_DDR,
        }
    }
}

/// Channel sequencer operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerMode {
    /// Sequencer stopped; channel enables may be changed.
    Safe,
    /// Convert every enabled channel once.
    SinglePass,
    /// Convert every enabled channel repeatedly.
    ContinuousPass,
    /// Convert one selected channel.
    SingleChannel,
}

/// System monitor driver errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// Channel enables were written while the sequencer was running.
    #[error("sequencer must be in safe mode to change channel enables")]
    SequencerNotSafe,
}

/// XADC driver.
pub trait SystemMonitor {
    /// Switch the channel sequencer mode.
    fn set_sequencer_mode(&mut self, mode: SequencerMode);

    /// Select the channels the sequencer converts.
    fn set_channel_enables(&mut self, channels: SequenceChannels) -> Result<(), AdcError>;

    /// Enable the alarm outputs in `mask` (0 disables every alarm).
    fn set_alarm_enables(&mut self, mask: u32);

    /// Latest raw conversion result for `channel`.
    fn read_raw(&mut self, channel: AdcChannel) -> u16;
}

/// Convert a raw supply reading to volts.
#[allow(clippy::arithmetic_side_effects)] // Safety: 12-bit code, constant non-zero divisor
pub fn raw_to_voltage(raw: u16) -> f32 {
    f32::from(raw >> 4) * SUPPLY_FULL_SCALE_VOLTS / ADC_CODES
}

/// Convert a raw temperature reading to degrees Celsius.
#[allow(clippy::arithmetic_side_effects)] // Safety: 12-bit code, constant non-zero divisor
pub fn raw_to_temperature(raw: u16) -> f32 {
    f32::from(raw >> 4) * TEMP_SCALE / ADC_CODES - KELVIN_OFFSET
}
