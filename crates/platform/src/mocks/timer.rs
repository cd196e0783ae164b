use crate::clock_config::{CPU_1X_CLOCK_HZ, CPU_3X2X_CLOCK_HZ};
use crate::device::{DeviceId, Peripheral};
use crate::timer::{IntervalTimer, MatchChannel, OneShotTimer, TimerIrq, TimerOptions};

use super::{lookup, self_test_passes, MockConfig, MockIrqLine};

/// Mock Cortex-A9 private timer.
#[derive(Debug)]
pub struct MockPrivateTimer {
    id: DeviceId,
    input_clock_hz: u32,
    loaded: u32,
    starts: usize,
    interrupt_enabled: bool,
    line: MockIrqLine,
}

impl MockPrivateTimer {
    /// Create a timer counting `input_clock_hz`.
    pub fn new(input_clock_hz: u32) -> Self {
        Self {
            id: DeviceId(0),
            input_clock_hz,
            loaded: 0,
            starts: 0,
            interrupt_enabled: false,
            line: MockIrqLine::new(),
        }
    }

    /// Value last written to the load register
    pub fn loaded(&self) -> u32 {
        self.loaded
    }

    /// Number of `start` calls
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Whether the expiry interrupt is enabled
    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }

    /// Simulate the countdown reaching zero.
    ///
    /// Returns whether the timer would raise its interrupt.
    pub fn expire(&self) -> bool {
        if self.interrupt_enabled {
            self.line.pend();
        }
        self.interrupt_enabled
    }
}

impl Peripheral for MockPrivateTimer {
    type Config = MockConfig;

    fn lookup_config(id: DeviceId) -> Option<MockConfig> {
        lookup(id)
    }

    fn initialize(config: MockConfig) -> Option<Self> {
        let mut timer = Self::new(CPU_3X2X_CLOCK_HZ);
        timer.id = config.id;
        Some(timer)
    }

    fn self_test(&mut self) -> bool {
        self_test_passes(self.id)
    }
}

impl OneShotTimer for MockPrivateTimer {
    type Line = MockIrqLine;

    fn input_clock_hz(&self) -> u32 {
        self.input_clock_hz
    }

    fn load(&mut self, ticks: u32) {
        self.loaded = ticks;
    }

    fn start(&mut self) {
        self.starts = self.starts.saturating_add(1);
    }

    fn enable_interrupt(&mut self) {
        self.interrupt_enabled = true;
    }

    fn line(&self) -> MockIrqLine {
        self.line.clone()
    }
}

/// Mock triple-timer-counter channel.
#[derive(Debug)]
pub struct MockIntervalTimer {
    id: DeviceId,
    input_clock_hz: u32,
    counter_width_bits: u32,
    options: TimerOptions,
    interval: u32,
    prescaler: u8,
    match_values: [u32; 3],
    match_readback_skew: u32,
    enabled_irqs: TimerIrq,
    running: bool,
    line: MockIrqLine,
}

impl MockIntervalTimer {
    /// Create a 16-bit counter clocked at `input_clock_hz`.
    pub fn new(input_clock_hz: u32) -> Self {
        Self {
            id: DeviceId(0),
            input_clock_hz,
            counter_width_bits: 16,
            options: TimerOptions::empty(),
            interval: 0,
            prescaler: 0,
            match_values: [0; 3],
            match_readback_skew: 0,
            enabled_irqs: TimerIrq::empty(),
            running: false,
            line: MockIrqLine::new(),
        }
    }

    /// Make match register reads return the written value plus `skew`,
    /// as a misconfigured counter would.
    pub fn with_match_readback_skew(mut self, skew: u32) -> Self {
        self.match_readback_skew = skew;
        self
    }

    /// Current option set
    pub fn options(&self) -> TimerOptions {
        self.options
    }

    /// Current interval register
    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Current prescaler
    pub fn prescaler(&self) -> u8 {
        self.prescaler
    }

    /// Enabled interrupt mask
    pub fn enabled_irqs(&self) -> TimerIrq {
        self.enabled_irqs
    }

    /// Whether the counter is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Simulate the counter reaching the interval value.
    ///
    /// Returns whether the counter would raise its interrupt.
    pub fn elapse_interval(&self) -> bool {
        let fires = self.running && self.enabled_irqs.contains(TimerIrq::INTERVAL);
        if fires {
            self.line.pend();
        }
        fires
    }
}

impl Peripheral for MockIntervalTimer {
    type Config = MockConfig;

    fn lookup_config(id: DeviceId) -> Option<MockConfig> {
        lookup(id)
    }

    fn initialize(config: MockConfig) -> Option<Self> {
        let mut timer = Self::new(CPU_1X_CLOCK_HZ);
        timer.id = config.id;
        Some(timer)
    }

    fn self_test(&mut self) -> bool {
        self_test_passes(self.id)
    }
}

impl IntervalTimer for MockIntervalTimer {
    type Line = MockIrqLine;

    fn input_clock_hz(&self) -> u32 {
        self.input_clock_hz
    }

    fn counter_width_bits(&self) -> u32 {
        self.counter_width_bits
    }

    fn set_options(&mut self, options: TimerOptions) {
        self.options = options;
    }

    fn set_interval(&mut self, interval: u32) {
        self.interval = interval;
    }

    fn set_prescaler(&mut self, prescaler: u8) {
        self.prescaler = prescaler;
    }

    fn set_match_value(&mut self, channel: MatchChannel, value: u32) {
        if let Some(slot) = self.match_values.get_mut(channel.index()) {
            *slot = value;
        }
    }

    fn match_value(&self, channel: MatchChannel) -> u32 {
        self.match_values
            .get(channel.index())
            .copied()
            .unwrap_or_default()
            .wrapping_add(self.match_readback_skew)
    }

    fn enable_interrupts(&mut self, mask: TimerIrq) {
        self.enabled_irqs |= mask;
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn line(&self, _mask: TimerIrq) -> MockIrqLine {
        self.line.clone()
    }
}
