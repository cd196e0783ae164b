use crate::clock_config::CPU_3X2X_CLOCK_HZ;
use crate::device::{DeviceId, Peripheral};
use crate::watchdog::WatchdogDevice;

use super::{lookup, self_test_passes, MockConfig, MockIrqLine};

/// How the mock's reset-status latch behaves when read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchBehavior {
    /// Reading the latch clears it.
    ClearOnRead,
    /// The latch stays set until the next power-on reset.
    Sticky,
}

/// Mock watchdog with a simulated countdown.
///
/// Time only moves when the test calls [`MockWatchdog::advance`]. Reaching
/// zero in watchdog mode counts a system reset, sets the reset latch and
/// stops the counter, as a real reset would.
#[derive(Debug)]
pub struct MockWatchdog {
    id: DeviceId,
    input_clock_hz: u32,
    latch_behavior: LatchBehavior,
    expired_latch: bool,
    watchdog_mode: bool,
    load_value: u32,
    remaining: u32,
    running: bool,
    interrupt_enabled: bool,
    restarts: usize,
    resets: usize,
    line: MockIrqLine,
}

impl MockWatchdog {
    /// A stopped watchdog with a clear latch.
    pub fn new(input_clock_hz: u32, latch_behavior: LatchBehavior) -> Self {
        Self {
            id: DeviceId(0),
            input_clock_hz,
            latch_behavior,
            expired_latch: false,
            watchdog_mode: false,
            load_value: 0,
            remaining: 0,
            running: false,
            interrupt_enabled: false,
            restarts: 0,
            resets: 0,
            line: MockIrqLine::new(),
        }
    }

    /// Pretend the previous run ended in a watchdog reset.
    pub fn with_expired_latch(mut self) -> Self {
        self.expired_latch = true;
        self
    }

    /// Let `ticks` counter ticks elapse.
    ///
    /// Returns whether the counter expired during the interval.
    pub fn advance(&mut self, ticks: u32) -> bool {
        if !self.running {
            return false;
        }
        if ticks < self.remaining {
            self.remaining = self.remaining.saturating_sub(ticks);
            return false;
        }
        self.remaining = 0;
        self.running = false;
        if self.interrupt_enabled {
            self.line.pend();
        }
        if self.watchdog_mode {
            self.resets = self.resets.saturating_add(1);
            self.expired_latch = true;
        }
        true
    }

    /// Number of system resets the watchdog caused
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Number of `restart` calls
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Ticks left before expiry
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether the counter is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether watchdog (reset) mode is selected
    pub fn is_watchdog_mode(&self) -> bool {
        self.watchdog_mode
    }
}

impl Peripheral for MockWatchdog {
    type Config = MockConfig;

    fn lookup_config(id: DeviceId) -> Option<MockConfig> {
        lookup(id)
    }

    fn initialize(config: MockConfig) -> Option<Self> {
        let mut wdt = Self::new(CPU_3X2X_CLOCK_HZ, LatchBehavior::Sticky);
        wdt.id = config.id;
        Some(wdt)
    }

    fn self_test(&mut self) -> bool {
        self_test_passes(self.id)
    }
}

impl WatchdogDevice for MockWatchdog {
    type Line = MockIrqLine;

    fn input_clock_hz(&self) -> u32 {
        self.input_clock_hz
    }

    fn set_watchdog_mode(&mut self) {
        self.watchdog_mode = true;
    }

    fn load(&mut self, ticks: u32) {
        self.load_value = ticks;
    }

    fn start(&mut self) {
        self.remaining = self.load_value;
        self.running = true;
    }

    fn restart(&mut self) {
        self.restarts = self.restarts.saturating_add(1);
        self.remaining = self.load_value;
    }

    fn read_expired_latch(&mut self) -> bool {
        let value = self.expired_latch;
        if self.latch_behavior == LatchBehavior::ClearOnRead {
            self.expired_latch = false;
        }
        value
    }

    fn enable_interrupt(&mut self) {
        self.interrupt_enabled = true;
    }

    fn line(&self) -> MockIrqLine {
        self.line.clone()
    }
}
