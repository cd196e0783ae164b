use std::vec::Vec;

use crate::device::{DeviceId, Peripheral};
use crate::dma::{DmaChannelId, DmaController, DmaTransfer};
use crate::dma_safety::{CacheCoherence, DataCache};

use super::{lookup, self_test_passes, MockConfig, MockIrqLine};

/// Number of DMAC channels.
const CHANNELS: usize = 8;

/// What the mock controller does with a started transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockDmaBehavior {
    /// Copy the bytes and signal done.
    Copy,
    /// Copy the bytes, flip the last one, and signal done.
    Corrupt,
    /// Copy nothing and signal a fault.
    Fault,
    /// Copy nothing and signal nothing.
    Hang,
}

/// Mock PL330 DMA controller that performs transfers with `memcpy`.
#[derive(Debug)]
pub struct MockDma {
    id: DeviceId,
    behavior: MockDmaBehavior,
    coherence: CacheCoherence,
    signal_on_start: bool,
    done_lines: [MockIrqLine; CHANNELS],
    fault_line: MockIrqLine,
    started: Vec<(DmaChannelId, DmaTransfer)>,
    unsignalled: Option<DmaChannelId>,
}

impl Default for MockDma {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDma {
    /// A non-coherent controller that copies and signals done immediately.
    pub fn new() -> Self {
        Self {
            id: DeviceId(0),
            behavior: MockDmaBehavior::Copy,
            coherence: CacheCoherence::NonCoherent,
            signal_on_start: true,
            done_lines: core::array::from_fn(|_| MockIrqLine::new()),
            fault_line: MockIrqLine::new(),
            started: Vec::new(),
            unsignalled: None,
        }
    }

    /// Set what happens to the next transfers.
    pub fn set_behavior(&mut self, behavior: MockDmaBehavior) {
        self.behavior = behavior;
    }

    /// Report a coherent (ACP-attached) controller.
    pub fn with_coherence(mut self, coherence: CacheCoherence) -> Self {
        self.coherence = coherence;
        self
    }

    /// Hold done/fault interrupts back until [`MockDma::signal`] is called.
    pub fn with_deferred_signal(mut self) -> Self {
        self.signal_on_start = false;
        self
    }

    /// Every transfer started so far, in order.
    pub fn started(&self) -> &[(DmaChannelId, DmaTransfer)] {
        &self.started
    }

    /// Raise the interrupt held back for the last transfer.
    ///
    /// Returns whether an interrupt was raised.
    pub fn signal(&mut self) -> bool {
        match self.unsignalled.take() {
            Some(channel) => {
                self.raise(channel);
                true
            }
            None => false,
        }
    }

    fn raise(&self, channel: DmaChannelId) {
        match self.behavior {
            MockDmaBehavior::Copy | MockDmaBehavior::Corrupt => {
                if let Some(line) = self.done_lines.get(usize::from(channel.0)) {
                    line.pend();
                }
            }
            MockDmaBehavior::Fault => self.fault_line.pend(),
            MockDmaBehavior::Hang => {}
        }
    }
}

impl Peripheral for MockDma {
    type Config = MockConfig;

    fn lookup_config(id: DeviceId) -> Option<MockConfig> {
        lookup(id)
    }

    fn initialize(config: MockConfig) -> Option<Self> {
        let mut dma = Self::new();
        dma.id = config.id;
        Some(dma)
    }

    fn self_test(&mut self) -> bool {
        self_test_passes(self.id)
    }
}

/// DMA controller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockDmaError {
    /// Channel number above 7.
    InvalidChannel(DmaChannelId),
}

impl DmaController for MockDma {
    type Error = MockDmaError;
    type Line = MockIrqLine;

    unsafe fn start(
        &mut self,
        channel: DmaChannelId,
        transfer: &DmaTransfer,
    ) -> Result<(), Self::Error> {
        if usize::from(channel.0) >= CHANNELS {
            return Err(MockDmaError::InvalidChannel(channel));
        }
        self.started.push((channel, *transfer));

        if matches!(self.behavior, MockDmaBehavior::Copy | MockDmaBehavior::Corrupt) {
            let len = transfer.length_bytes() as usize;
            // SAFETY: the caller guarantees both ranges are valid, validated,
            // and not accessed by the CPU until the transfer signals.
            unsafe {
                core::ptr::copy(transfer.source(), transfer.destination(), len);
                if self.behavior == MockDmaBehavior::Corrupt && len > 0 {
                    let last = transfer.destination().add(len.saturating_sub(1));
                    *last ^= 0xFF;
                }
            }
        }

        if self.signal_on_start {
            self.raise(channel);
        } else {
            self.unsignalled = Some(channel);
        }
        Ok(())
    }

    fn coherence(&self) -> CacheCoherence {
        self.coherence
    }

    fn done_line(&self, channel: DmaChannelId) -> MockIrqLine {
        self.done_lines
            .get(usize::from(channel.0))
            .cloned()
            .unwrap_or_default()
    }

    fn fault_line(&self) -> MockIrqLine {
        self.fault_line.clone()
    }
}

/// Mock L1 data cache that records maintenance operations.
#[derive(Debug)]
pub struct MockDataCache {
    enabled: bool,
    cleaned: Vec<(usize, usize)>,
    invalidated: Vec<(usize, usize)>,
}

impl Default for MockDataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDataCache {
    /// An enabled cache with no maintenance recorded.
    pub fn new() -> Self {
        Self {
            enabled: true,
            cleaned: Vec::new(),
            invalidated: Vec::new(),
        }
    }

    /// Ranges cleaned so far
    pub fn cleaned(&self) -> &[(usize, usize)] {
        &self.cleaned
    }

    /// Ranges invalidated so far
    pub fn invalidated(&self) -> &[(usize, usize)] {
        &self.invalidated
    }
}

impl DataCache for MockDataCache {
    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn clean_range(&mut self, addr: usize, len: usize) {
        self.cleaned.push((addr, len));
    }

    fn invalidate_range(&mut self, addr: usize, len: usize) {
        self.invalidated.push((addr, len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::InterruptAck;

    #[test]
    fn copy_transfer_moves_bytes_and_signals_done() {
        let src: [u8; 16] = core::array::from_fn(|i| i as u8);
        let mut dst = [0u8; 16];
        let mut dma = MockDma::new();
        let t = DmaTransfer::mem_to_mem(&src, &mut dst).expect("valid transfer");
        // SAFETY: buffers outlive the synchronous mock copy.
        unsafe { dma.start(DmaChannelId(0), &t).expect("channel 0 exists") };
        assert_eq!(src, dst);
        assert!(dma.done_line(DmaChannelId(0)).acknowledge());
        assert!(!dma.fault_line().acknowledge());
    }

    #[test]
    fn fault_behavior_leaves_destination_untouched() {
        let src = [0xAAu8; 8];
        let mut dst = [0u8; 8];
        let mut dma = MockDma::new();
        dma.set_behavior(MockDmaBehavior::Fault);
        let t = DmaTransfer::mem_to_mem(&src, &mut dst).expect("valid transfer");
        // SAFETY: buffers outlive the synchronous mock copy.
        unsafe { dma.start(DmaChannelId(0), &t).expect("channel 0 exists") };
        assert_eq!(dst, [0u8; 8]);
        assert!(dma.fault_line().acknowledge());
    }

    #[test]
    fn deferred_signal_waits_for_signal_call() {
        let src = [1u8; 4];
        let mut dst = [0u8; 4];
        let mut dma = MockDma::new().with_deferred_signal();
        let t = DmaTransfer::mem_to_mem(&src, &mut dst).expect("valid transfer");
        // SAFETY: buffers outlive the synchronous mock copy.
        unsafe { dma.start(DmaChannelId(1), &t).expect("channel 1 exists") };
        let done = dma.done_line(DmaChannelId(1));
        assert!(!done.is_pending());
        assert!(dma.signal());
        assert!(done.is_pending());
        assert!(!dma.signal());
    }
}
