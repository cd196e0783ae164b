use crate::adc::{AdcChannel, AdcError, SequenceChannels, SequencerMode, SystemMonitor};
use crate::device::{DeviceId, Peripheral};

use super::{lookup, self_test_passes, MockConfig};

/// Mock XADC with fixed raw conversion results.
#[derive(Debug)]
pub struct MockSystemMonitor {
    id: DeviceId,
    mode: SequencerMode,
    enabled: SequenceChannels,
    alarms: u32,
    raw: [u16; AdcChannel::ALL.len()],
    reads: usize,
}

impl Default for MockSystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSystemMonitor {
    /// Sequencer in safe mode, every channel reading zero.
    pub fn new() -> Self {
        Self {
            id: DeviceId(0),
            mode: SequencerMode::Safe,
            enabled: SequenceChannels::empty(),
            alarms: u32::MAX,
            raw: [0; AdcChannel::ALL.len()],
            reads: 0,
        }
    }

    /// Make `channel` read `raw`.
    pub fn with_raw(mut self, channel: AdcChannel, raw: u16) -> Self {
        if let Some(slot) = Self::slot(channel).and_then(|i| self.raw.get_mut(i)) {
            *slot = raw;
        }
        self
    }

    /// Current sequencer mode
    pub fn mode(&self) -> SequencerMode {
        self.mode
    }

    /// Enabled channel mask
    pub fn enabled(&self) -> SequenceChannels {
        self.enabled
    }

    /// Alarm enable mask
    pub fn alarms(&self) -> u32 {
        self.alarms
    }

    /// Number of conversions read
    pub fn reads(&self) -> usize {
        self.reads
    }

    fn slot(channel: AdcChannel) -> Option<usize> {
        AdcChannel::ALL.iter().position(|c| *c == channel)
    }
}

impl Peripheral for MockSystemMonitor {
    type Config = MockConfig;

    fn lookup_config(id: DeviceId) -> Option<MockConfig> {
        lookup(id)
    }

    fn initialize(config: MockConfig) -> Option<Self> {
        let mut adc = Self::new();
        adc.id = config.id;
        Some(adc)
    }

    fn self_test(&mut self) -> bool {
        self_test_passes(self.id)
    }
}

impl SystemMonitor for MockSystemMonitor {
    fn set_sequencer_mode(&mut self, mode: SequencerMode) {
        self.mode = mode;
    }

    fn set_channel_enables(&mut self, channels: SequenceChannels) -> Result<(), AdcError> {
        if self.mode != SequencerMode::Safe {
            return Err(AdcError::SequencerNotSafe);
        }
        self.enabled = channels;
        Ok(())
    }

    fn set_alarm_enables(&mut self, mask: u32) {
        self.alarms = mask;
    }

    fn read_raw(&mut self, channel: AdcChannel) -> u16 {
        self.reads = self.reads.saturating_add(1);
        Self::slot(channel)
            .and_then(|i| self.raw.get(i))
            .copied()
            .unwrap_or_default()
    }
}
