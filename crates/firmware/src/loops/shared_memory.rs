//! Two processors sharing one block RAM cell: the publisher stores the
//! switch bank, the mirror copies the cell to the LED bank.
//!
//! The cell has one writer and one reader. A byte store is a single bus
//! write, so no lock is needed.

use control_core::fatal::FatalReason;
use embedded_hal::delay::DelayNs;
use platform::gpio::PinGroup;
use platform::shared_memory::SharedMemory;

use super::{ControlLoop, Progress};

/// Shared cell and polling period, same on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedMemoryConfig {
    /// Byte offset of the cell
    pub offset: usize,
    /// Delay between passes
    pub period_us: u32,
}

impl Default for SharedMemoryConfig {
    fn default() -> Self {
        Self {
            offset: 0,
            period_us: 1_000,
        }
    }
}

/// Writer side: switch bank into the cell.
pub struct SharedMemoryPublisher<P, S, D> {
    switches: P,
    memory: S,
    delay: D,
    config: SharedMemoryConfig,
}

impl<P: PinGroup, S: SharedMemory, D: DelayNs> SharedMemoryPublisher<P, S, D> {
    /// Publisher over `memory`.
    pub fn new(switches: P, memory: S, delay: D, config: SharedMemoryConfig) -> Self {
        Self {
            switches,
            memory,
            delay,
            config,
        }
    }
}

impl<P: PinGroup, S: SharedMemory, D: DelayNs> ControlLoop for SharedMemoryPublisher<P, S, D> {
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        let progress = match self.switches.read() {
            Ok(value) => {
                // The switch bank is eight bits wide.
                self.memory
                    .write_byte(self.config.offset, value.to_le_bytes()[0]);
                Progress::Acted
            }
            Err(_) => Progress::Idle,
        };
        self.delay.delay_us(self.config.period_us);
        Ok(progress)
    }
}

/// Reader side: cell onto the LED bank.
pub struct SharedMemoryMirror<S, P, D> {
    memory: S,
    leds: P,
    delay: D,
    config: SharedMemoryConfig,
}

impl<S: SharedMemory, P: PinGroup, D: DelayNs> SharedMemoryMirror<S, P, D> {
    /// Mirror reading `memory`.
    pub fn new(memory: S, leds: P, delay: D, config: SharedMemoryConfig) -> Self {
        Self {
            memory,
            leds,
            delay,
            config,
        }
    }
}

impl<S: SharedMemory, P: PinGroup, D: DelayNs> ControlLoop for SharedMemoryMirror<S, P, D> {
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        let value = self.memory.read_byte(self.config.offset);
        let progress = match self.leds.write(u32::from(value)) {
            Ok(()) => Progress::Acted,
            Err(_) => Progress::Idle,
        };
        self.delay.delay_us(self.config.period_us);
        Ok(progress)
    }
}
