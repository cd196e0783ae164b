//! DMA cache maintenance and buffer alignment for Zynq-7000.
//!
//! ## DMA Accessibility on Zynq-7000 (PS view)
//!
//! | Memory Region | Base Address | Size    | DMAC | Cached by L1/L2 | Use case |
//! |---------------|-------------|---------|------|-----------------|----------|
//! | OCM (low)     | 0x0000_0000 | 192 KB  | YES  | configurable    | Vectors, stacks, small DMA buffers |
//! | OCM (high)    | 0xFFFC_0000 | 256 KB  | YES  | configurable    | FSBL, boot scratch |
//! | DDR           | 0x0010_0000 | 511 MB  | YES  | YES (default)   | Application, DMA buffers |
//! | QSPI linear   | 0xFC00_0000 | 32 MB   | read | YES             | XiP code only |
//!
//! The PL330 DMAC is not cache coherent with the Cortex-A9 L1 data cache.
//! Any DMA buffer in cached memory needs either the data cache disabled, or
//! a clean of the source range before a transfer and an invalidate of the
//! destination range after it.

/// Cortex-A9 L1 data cache line size in bytes.
///
/// Cache maintenance by address works on whole lines, so a DMA buffer that
/// shares a line with CPU-owned data can lose that data on invalidate.
pub const CACHE_LINE_BYTES: usize = 32;

// ── Cache coherence ──────────────────────────────────────────────────────────

/// Whether a bus master sees the same memory contents as the CPU data cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheCoherence {
    /// Snooped through the SCU / ACP; no maintenance needed.
    Coherent,
    /// Not snooped; the CPU must clean / invalidate or disable the cache.
    NonCoherent,
}

/// Processor data cache maintenance operations.
pub trait DataCache {
    /// Disable (and flush) the data cache.
    fn disable(&mut self);

    /// Whether the data cache is currently enabled.
    fn is_enabled(&self) -> bool;

    /// Write back dirty lines covering `[addr, addr + len)` to memory.
    fn clean_range(&mut self, addr: usize, len: usize);

    /// Discard lines covering `[addr, addr + len)` so the next read comes
    /// from memory.
    fn invalidate_range(&mut self, addr: usize, len: usize);
}

// ── Buffer alignment ─────────────────────────────────────────────────────────

/// Wrapper that aligns `T` to a cache line.
///
/// DMA buffers wrapped in `Align32` never share a cache line with other
/// data, so invalidating the buffer's range cannot discard unrelated writes.
#[repr(C, align(32))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Align32<T>(pub T);

impl<T> core::ops::Deref for Align32<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> core::ops::DerefMut for Align32<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: crate::dma::DmaBuffer> crate::dma::DmaBuffer for Align32<T> {
    fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T: crate::dma::DmaBufferMut> crate::dma::DmaBufferMut for Align32<T> {
    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align32_places_buffer_on_cache_line() {
        let buf = Align32([0u8; 128]);
        assert_eq!(core::mem::align_of_val(&buf), CACHE_LINE_BYTES);
        assert_eq!((buf.0.as_ptr() as usize) % CACHE_LINE_BYTES, 0);
        assert_eq!(buf.len(), 128);
    }
}
