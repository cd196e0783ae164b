//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests, and for the desktop emulator.
//!
//! Interrupt-context handles ([`MockIrqLine`], [`MockGpioLine`]) share their
//! state with the owning mock through `Arc`, so a test (or an emulator
//! thread) can raise a pending condition while the control loop owns the
//! driver.

#![cfg(any(test, feature = "std"))]

mod adc;
mod dma;
mod gpio;
mod memory;
mod timer;
mod watchdog;

pub use adc::MockSystemMonitor;
pub use dma::{MockDataCache, MockDma, MockDmaBehavior, MockDmaError};
pub use gpio::{MockGpio, MockGpioHandle, MockGpioLine, MockPinGroup};
pub use memory::MockSharedMemory;
pub use timer::{MockIntervalTimer, MockPrivateTimer};
pub use watchdog::{LatchBehavior, MockWatchdog};

use std::string::String;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use crate::console::Console;
use crate::device::DeviceId;
use crate::interrupt::{InterruptAck, InterruptController, IrqSource};
use crate::timer::OneShotRearm;

/// Lookup of this device id fails (configuration not found).
pub const MISSING_DEVICE: DeviceId = DeviceId(0xFFFF);

/// This device id brings up a driver whose self test fails.
pub const FAILING_SELF_TEST: DeviceId = DeviceId(0xFFFE);

/// Configuration record handed out by every mock's `lookup_config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockConfig {
    /// Device id the record was looked up with
    pub id: DeviceId,
}

pub(crate) fn lookup(id: DeviceId) -> Option<MockConfig> {
    (id != MISSING_DEVICE).then_some(MockConfig { id })
}

pub(crate) fn self_test_passes(id: DeviceId) -> bool {
    id != FAILING_SELF_TEST
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Interrupt line ───────────────────────────────────────────────────────────

#[derive(Debug)]
struct LineState {
    pending: AtomicBool,
    qualifies: AtomicBool,
    acks: AtomicUsize,
    rearms: AtomicUsize,
    last_rearm_ticks: AtomicU32,
}

/// Pending-interrupt latch shared between a mock peripheral and its handler.
#[derive(Debug, Clone)]
pub struct MockIrqLine {
    state: Arc<LineState>,
}

impl Default for MockIrqLine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIrqLine {
    /// A line with nothing pending whose events qualify.
    pub fn new() -> Self {
        Self {
            state: Arc::new(LineState {
                pending: AtomicBool::new(false),
                qualifies: AtomicBool::new(true),
                acks: AtomicUsize::new(0),
                rearms: AtomicUsize::new(0),
                last_rearm_ticks: AtomicU32::new(0),
            }),
        }
    }

    /// Latch a pending condition, as the peripheral would.
    pub fn pend(&self) {
        self.state.pending.store(true, Ordering::Release);
    }

    /// Whether a condition is latched and not yet acknowledged.
    pub fn is_pending(&self) -> bool {
        self.state.pending.load(Ordering::Acquire)
    }

    /// Make later acknowledgements report (or not report) a qualifying event.
    pub fn set_qualifies(&self, qualifies: bool) {
        self.state.qualifies.store(qualifies, Ordering::Release);
    }

    /// Number of acknowledgements so far.
    pub fn ack_count(&self) -> usize {
        self.state.acks.load(Ordering::Acquire)
    }

    /// Number of one-shot re-arms so far.
    pub fn rearm_count(&self) -> usize {
        self.state.rearms.load(Ordering::Acquire)
    }

    /// Tick count of the last re-arm.
    pub fn last_rearm_ticks(&self) -> u32 {
        self.state.last_rearm_ticks.load(Ordering::Acquire)
    }
}

impl InterruptAck for MockIrqLine {
    fn acknowledge(&self) -> bool {
        self.state.acks.fetch_add(1, Ordering::AcqRel);
        let was_pending = self.state.pending.swap(false, Ordering::AcqRel);
        was_pending && self.state.qualifies.load(Ordering::Acquire)
    }
}

impl OneShotRearm for MockIrqLine {
    fn rearm(&self, ticks: u32) {
        self.state.last_rearm_ticks.store(ticks, Ordering::Release);
        self.state.rearms.fetch_add(1, Ordering::AcqRel);
    }
}

// ── Interrupt controller ─────────────────────────────────────────────────────

/// Interrupt controller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockGicError {
    /// The source id is outside the GIC's 96 interrupt ids.
    InvalidSource(IrqSource),
}

/// Mock GIC that records connections and enable state.
#[derive(Debug, Default)]
pub struct MockGic {
    connected: Vec<IrqSource>,
    enabled: Vec<IrqSource>,
    processor_interrupts: bool,
}

impl MockGic {
    /// Highest valid GIC interrupt id.
    pub const MAX_SOURCE: u16 = 95;

    /// Create new mock controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `source` was connected
    pub fn is_connected(&self, source: IrqSource) -> bool {
        self.connected.contains(&source)
    }

    /// Whether `source` is currently unmasked
    pub fn is_enabled(&self, source: IrqSource) -> bool {
        self.enabled.contains(&source)
    }

    /// Whether processor interrupts were unmasked
    pub fn processor_interrupts_enabled(&self) -> bool {
        self.processor_interrupts
    }
}

impl crate::device::Peripheral for MockGic {
    type Config = MockConfig;

    fn lookup_config(id: DeviceId) -> Option<MockConfig> {
        lookup(id)
    }

    fn initialize(_config: MockConfig) -> Option<Self> {
        Some(Self::new())
    }

    fn self_test(&mut self) -> bool {
        true
    }
}

impl InterruptController for MockGic {
    type Error = MockGicError;

    fn connect(&mut self, source: IrqSource) -> Result<(), Self::Error> {
        if source.0 > Self::MAX_SOURCE {
            return Err(MockGicError::InvalidSource(source));
        }
        if !self.connected.contains(&source) {
            self.connected.push(source);
        }
        Ok(())
    }

    fn enable(&mut self, source: IrqSource) {
        if !self.enabled.contains(&source) {
            self.enabled.push(source);
        }
    }

    fn disable(&mut self, source: IrqSource) {
        self.enabled.retain(|s| *s != source);
    }

    fn enable_processor_interrupts(&mut self) {
        self.processor_interrupts = true;
    }
}

// ── Console ──────────────────────────────────────────────────────────────────

/// Console that keeps every line; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MockConsole {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MockConsole {
    /// Create new mock console
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line written so far
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    /// Number of lines equal to `line`
    pub fn count(&self, line: &str) -> usize {
        lock(&self.lines).iter().filter(|l| *l == line).count()
    }
}

impl Console for MockConsole {
    fn write_line(&mut self, line: &str) {
        lock(&self.lines).push(String::from(line));
    }
}

// ── Byte sink ────────────────────────────────────────────────────────────────

/// UART transmit side that records bytes; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MockUart {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MockUart {
    /// Create new mock UART
    pub fn new() -> Self {
        Self::default()
    }

    /// Every byte sent so far
    pub fn sent(&self) -> Vec<u8> {
        lock(&self.bytes).clone()
    }
}

impl embedded_io::ErrorType for MockUart {
    type Error = core::convert::Infallible;
}

impl embedded_io::Write for MockUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        lock(&self.bytes).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ── Delay ────────────────────────────────────────────────────────────────────

/// Delay provider that returns immediately and accumulates requested time.
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    total_ns: Arc<AtomicU64>,
}

impl MockDelay {
    /// Create new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Total delay requested so far, in nanoseconds
    pub fn total_ns(&self) -> u64 {
        self.total_ns.load(Ordering::Acquire)
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.fetch_add(u64::from(ns), Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::bring_up;

    #[test]
    fn irq_line_acknowledge_clears_pending() {
        let line = MockIrqLine::new();
        assert!(!line.acknowledge());
        line.pend();
        let handler_side = line.clone();
        assert!(handler_side.acknowledge());
        assert!(!line.is_pending());
        assert_eq!(line.ack_count(), 2);
    }

    #[test]
    fn non_qualifying_event_is_still_cleared() {
        let line = MockIrqLine::new();
        line.set_qualifies(false);
        line.pend();
        assert!(!line.acknowledge());
        assert!(!line.is_pending());
    }

    #[test]
    fn gic_rejects_out_of_range_source() {
        let mut gic = MockGic::new();
        assert!(gic.connect(IrqSource(29)).is_ok());
        assert_eq!(
            gic.connect(IrqSource(200)),
            Err(MockGicError::InvalidSource(IrqSource(200)))
        );
        assert!(gic.is_connected(IrqSource(29)));
    }

    #[test]
    fn bring_up_missing_gic_fails() {
        assert!(bring_up::<MockGic>(DeviceId(0)).is_ok());
        assert!(bring_up::<MockGic>(MISSING_DEVICE).is_err());
    }

    #[test]
    fn mock_delay_accumulates() {
        use embedded_hal::delay::DelayNs;
        let mut delay = MockDelay::new();
        delay.delay_ms(250);
        delay.delay_ms(250);
        assert_eq!(delay.total_ns(), 500_000_000);
    }
}
