//! DMA abstraction layer
//!
//! Descriptor-based memory-to-memory transfers on the PL330 DMA controller
//! (DMAC) of the Zynq PS.
//!
//! A [`DmaTransfer`] can only be created fully zeroed, then filled in through
//! setters. The DMAC microcode generator reads every descriptor field,
//! including the ones a given transfer does not care about, so stale stack
//! contents in an unset field turn into undefined bus behavior.

use thiserror::Error;

use crate::dma_safety::CacheCoherence;
use crate::interrupt::InterruptAck;

/// DMAC channel number (0..=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaChannelId(pub u8);

/// Burst sizes (bytes per beat) the AXI master supports.
pub const VALID_BURST_SIZES: [u8; 4] = [1, 2, 4, 8];

/// Longest burst (beats per burst) the DMAC supports.
pub const MAX_BURST_LENGTH: u8 = 16;

/// Reasons a descriptor is rejected before it reaches the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferFault {
    /// `length_bytes` is zero.
    #[error("transfer length is zero")]
    ZeroLength,
    /// The source address is null.
    #[error("source address is null")]
    NullSource,
    /// The destination address is null.
    #[error("destination address is null")]
    NullDestination,
    /// Burst size is not one of [`VALID_BURST_SIZES`].
    #[error("unsupported burst size {0}")]
    InvalidBurstSize(u8),
    /// Burst length is outside `1..=MAX_BURST_LENGTH`.
    #[error("unsupported burst length {0}")]
    InvalidBurstLength(u8),
    /// The destination buffer is shorter than the source.
    #[error("destination holds {available} bytes, transfer needs {needed}")]
    DestinationTooSmall {
        /// Source length in bytes
        needed: usize,
        /// Destination length in bytes
        available: usize,
    },
    /// The transfer does not fit the 32-bit length field.
    #[error("transfer length does not fit in 32 bits")]
    TooLong,
}

/// One memory-to-memory transfer descriptor.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaTransfer {
    source: *const u8,
    destination: *mut u8,
    length_bytes: u32,
    burst_size: u8,
    burst_length: u8,
    increment_source: bool,
    increment_destination: bool,
}

impl DmaTransfer {
    /// A descriptor with every field zeroed (null addresses, zero length,
    /// no increments). This is the only way to start building one.
    pub const fn zeroed() -> Self {
        Self {
            source: core::ptr::null(),
            destination: core::ptr::null_mut(),
            length_bytes: 0,
            burst_size: 0,
            burst_length: 0,
            increment_source: false,
            increment_destination: false,
        }
    }

    /// Copy all of `source` to the start of `destination`.
    ///
    /// Uses 4-byte beats, 4-beat bursts and increments both addresses.
    pub fn mem_to_mem<S, D>(source: &S, destination: &mut D) -> Result<Self, TransferFault>
    where
        S: DmaBuffer + ?Sized,
        D: DmaBufferMut + ?Sized,
    {
        if destination.len() < source.len() {
            return Err(TransferFault::DestinationTooSmall {
                needed: source.len(),
                available: destination.len(),
            });
        }
        let length = u32::try_from(source.len()).map_err(|_| TransferFault::TooLong)?;
        Ok(Self::zeroed()
            .with_source(source.as_ptr())
            .with_destination(destination.as_mut_ptr())
            .with_length(length)
            .with_burst(4, 4)
            .with_increments(true, true))
    }

    /// Set the source address.
    pub const fn with_source(mut self, source: *const u8) -> Self {
        self.source = source;
        self
    }

    /// Set the destination address.
    pub const fn with_destination(mut self, destination: *mut u8) -> Self {
        self.destination = destination;
        self
    }

    /// Set the length in bytes.
    pub const fn with_length(mut self, length_bytes: u32) -> Self {
        self.length_bytes = length_bytes;
        self
    }

    /// Set beat size (bytes) and burst length (beats).
    pub const fn with_burst(mut self, size: u8, length: u8) -> Self {
        self.burst_size = size;
        self.burst_length = length;
        self
    }

    /// Set whether source and destination addresses advance per beat.
    pub const fn with_increments(mut self, source: bool, destination: bool) -> Self {
        self.increment_source = source;
        self.increment_destination = destination;
        self
    }

    /// Source address
    pub const fn source(&self) -> *const u8 {
        self.source
    }

    /// Destination address
    pub const fn destination(&self) -> *mut u8 {
        self.destination
    }

    /// Length in bytes
    pub const fn length_bytes(&self) -> u32 {
        self.length_bytes
    }

    /// Beat size in bytes
    pub const fn burst_size(&self) -> u8 {
        self.burst_size
    }

    /// Burst length in beats
    pub const fn burst_length(&self) -> u8 {
        self.burst_length
    }

    /// Whether the source address advances
    pub const fn increment_source(&self) -> bool {
        self.increment_source
    }

    /// Whether the destination address advances
    pub const fn increment_destination(&self) -> bool {
        self.increment_destination
    }

    /// Check the descriptor before it reaches the controller.
    pub fn validate(&self) -> Result<(), TransferFault> {
        if self.length_bytes == 0 {
            return Err(TransferFault::ZeroLength);
        }
        if self.source.is_null() {
            return Err(TransferFault::NullSource);
        }
        if self.destination.is_null() {
            return Err(TransferFault::NullDestination);
        }
        if !VALID_BURST_SIZES.contains(&self.burst_size) {
            return Err(TransferFault::InvalidBurstSize(self.burst_size));
        }
        if self.burst_length == 0 || self.burst_length > MAX_BURST_LENGTH {
            return Err(TransferFault::InvalidBurstLength(self.burst_length));
        }
        Ok(())
    }
}

impl Default for DmaTransfer {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// DMA controller driver.
pub trait DmaController {
    /// Driver error type
    type Error: core::fmt::Debug;

    /// Interrupt-context handle for the done / fault interrupts.
    type Line: InterruptAck;

    /// Generate the channel program for `transfer` and start it.
    ///
    /// Returns as soon as the channel is running; completion and faults are
    /// reported through the interrupt lines.
    ///
    /// # Safety
    ///
    /// `transfer` must have passed [`DmaTransfer::validate`]. The memory it
    /// describes must stay valid, and must not be accessed by the CPU, until
    /// the done or fault interrupt for this channel has fired.
    unsafe fn start(&mut self, channel: DmaChannelId, transfer: &DmaTransfer)
        -> Result<(), Self::Error>;

    /// Whether the DMAC sees the same memory as the CPU's data cache.
    fn coherence(&self) -> CacheCoherence;

    /// Handle for the per-channel done interrupt.
    fn done_line(&self, channel: DmaChannelId) -> Self::Line;

    /// Handle for the controller's abort (fault) interrupt.
    fn fault_line(&self) -> Self::Line;
}

/// DMA buffer trait (read-only access)
pub trait DmaBuffer {
    /// Get buffer pointer
    fn as_ptr(&self) -> *const u8;

    /// Get buffer length
    fn len(&self) -> usize;

    /// Check if buffer is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// DMA buffer trait (read-write access)
pub trait DmaBufferMut: DmaBuffer {
    /// Get mutable buffer pointer
    fn as_mut_ptr(&mut self) -> *mut u8;
}

impl DmaBuffer for [u8] {
    fn as_ptr(&self) -> *const u8 {
        <[u8]>::as_ptr(self)
    }

    fn len(&self) -> usize {
        <[u8]>::len(self)
    }
}

impl DmaBufferMut for [u8] {
    fn as_mut_ptr(&mut self) -> *mut u8 {
        <[u8]>::as_mut_ptr(self)
    }
}

impl<const N: usize> DmaBuffer for [u8; N] {
    fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    fn len(&self) -> usize {
        N
    }
}

impl<const N: usize> DmaBufferMut for [u8; N] {
    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.as_mut_slice().as_mut_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_descriptor_is_rejected_for_length_first() {
        let t = DmaTransfer::zeroed();
        assert_eq!(t, DmaTransfer::default());
        assert_eq!(t.validate(), Err(TransferFault::ZeroLength));
        assert!(t.source().is_null());
        assert!(t.destination().is_null());
    }

    #[test]
    fn mem_to_mem_uses_four_by_four_bursts() {
        let src = [0u8; 128];
        let mut dst = [0u8; 128];
        let t = DmaTransfer::mem_to_mem(&src, &mut dst).expect("same-size buffers");
        assert_eq!(t.length_bytes(), 128);
        assert_eq!((t.burst_size(), t.burst_length()), (4, 4));
        assert!(t.increment_source() && t.increment_destination());
        assert_eq!(t.validate(), Ok(()));
    }

    #[test]
    fn mem_to_mem_rejects_short_destination() {
        let src = [0u8; 16];
        let mut dst = [0u8; 8];
        assert_eq!(
            DmaTransfer::mem_to_mem(&src, &mut dst),
            Err(TransferFault::DestinationTooSmall {
                needed: 16,
                available: 8
            })
        );
    }

    #[test]
    fn validate_rejects_null_pointers_and_bad_bursts() {
        let mut byte = 0u8;
        let dst: *mut u8 = &mut byte;
        let base = DmaTransfer::zeroed().with_length(1).with_burst(4, 4);

        assert_eq!(
            base.with_destination(dst).validate(),
            Err(TransferFault::NullSource)
        );
        assert_eq!(
            base.with_source(dst.cast_const()).validate(),
            Err(TransferFault::NullDestination)
        );

        let full = base.with_source(dst.cast_const()).with_destination(dst);
        assert_eq!(full.validate(), Ok(()));
        assert_eq!(
            full.with_burst(3, 4).validate(),
            Err(TransferFault::InvalidBurstSize(3))
        );
        assert_eq!(
            full.with_burst(4, 0).validate(),
            Err(TransferFault::InvalidBurstLength(0))
        );
        assert_eq!(
            full.with_burst(4, 17).validate(),
            Err(TransferFault::InvalidBurstLength(17))
        );
    }
}
