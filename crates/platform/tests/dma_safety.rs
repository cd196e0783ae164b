//! Architecture tests: DMA buffer alignment and descriptor invariants.

// Test files legitimately use arithmetic for verification; allow at file level.
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::assertions_on_constants)]

use platform::dma::{DmaBuffer, DmaTransfer, TransferFault};
use platform::dma_safety::{Align32, CACHE_LINE_BYTES};

// Test 1: Align32 buffers never straddle a partial cache line
#[test]
fn align32_buffer_starts_and_ends_on_line_boundaries() {
    let buf = Align32([0u8; 128]);
    assert_eq!(buf.as_ptr() as usize % CACHE_LINE_BYTES, 0);
    assert_eq!(DmaBuffer::len(&buf) % CACHE_LINE_BYTES, 0);
}

// Test 2: a descriptor built with every field but length still fails closed
#[test]
fn partially_filled_descriptor_is_rejected() {
    let src = Align32([0u8; 32]);
    let mut dst = Align32([0u8; 32]);
    let full = DmaTransfer::mem_to_mem(&src, &mut dst).unwrap();
    assert_eq!(full.with_length(0).validate(), Err(TransferFault::ZeroLength));
}

// Test 3: descriptor layout is stable (repr(C)) and fits one cache line
#[test]
fn descriptor_fits_one_cache_line() {
    assert!(core::mem::size_of::<DmaTransfer>() <= CACHE_LINE_BYTES);
}
