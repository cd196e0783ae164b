//! Shared block RAM between a soft processor in the PL and the PS cores.
//!
//! Each cell has exactly one writer processor and one reader processor. A
//! single byte is read and written atomically by the AXI BRAM controller,
//! so no lock is needed as long as each value fits one cell.

/// Byte-addressed view of a shared block RAM.
pub trait SharedMemory {
    /// Read the byte at `offset`.
    fn read_byte(&self, offset: usize) -> u8;

    /// Write the byte at `offset`.
    fn write_byte(&mut self, offset: usize, value: u8);
}
