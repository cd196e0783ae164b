use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::vec::Vec;

use crate::shared_memory::SharedMemory;

/// Mock block RAM; clones are the two processors' views of the same memory.
#[derive(Debug, Clone)]
pub struct MockSharedMemory {
    cells: Arc<Vec<AtomicU8>>,
}

impl MockSharedMemory {
    /// `size` zeroed bytes.
    pub fn new(size: usize) -> Self {
        Self {
            cells: Arc::new((0..size).map(|_| AtomicU8::new(0)).collect()),
        }
    }
}

impl SharedMemory for MockSharedMemory {
    fn read_byte(&self, offset: usize) -> u8 {
        self.cells
            .get(offset)
            .map_or(0, |c| c.load(Ordering::Acquire))
    }

    fn write_byte(&mut self, offset: usize, value: u8) {
        if let Some(c) = self.cells.get(offset) {
            c.store(value, Ordering::Release);
        }
    }
}
