//! Memory sources for primitive sub-buffers.
//!
//! Blocks are word-aligned `Vec<u32>`s so vertex structs up to 4-byte
//! alignment can be viewed in place. A heap may refuse a request; callers
//! treat that as an ordinary allocation failure.

use std::cell::Cell;

/// Allocator for primitive sub-buffers.
pub trait BufferHeap {
    /// Zero-filled block of at least `bytes` bytes, or `None` if the request
    /// cannot be served.
    fn allocate(&self, bytes: usize) -> Option<Vec<u32>>;

    /// Return a block obtained from [`BufferHeap::allocate`].
    fn release(&self, block: Vec<u32>);

    /// Bytes currently handed out, if the heap keeps track.
    fn bytes_in_use(&self) -> usize {
        0
    }
}

#[inline]
pub(crate) fn words_for(bytes: usize) -> usize {
    (bytes + 3) / 4
}

fn zeroed_block(words: usize) -> Option<Vec<u32>> {
    let mut block = Vec::new();
    block.try_reserve_exact(words).ok()?;
    block.resize(words, 0);
    Some(block)
}

// ============================================================================
// SystemHeap
// ============================================================================

/// The global allocator, with fallible reservation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHeap;

impl BufferHeap for SystemHeap {
    fn allocate(&self, bytes: usize) -> Option<Vec<u32>> {
        let block = zeroed_block(words_for(bytes));
        if block.is_none() {
            log::warn!("system heap refused {} bytes", bytes);
        }
        block
    }

    fn release(&self, block: Vec<u32>) {
        drop(block);
    }
}

// ============================================================================
// ArenaHeap
// ============================================================================

/// A fixed byte budget, for targets where primitives draw from a dedicated
/// memory pool.
#[derive(Debug)]
pub struct ArenaHeap {
    budget: usize,
    used: Cell<usize>,
    peak: Cell<usize>,
}

impl ArenaHeap {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            used: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn available(&self) -> usize {
        self.budget - self.used.get()
    }

    /// Highest number of bytes in use at any time.
    pub fn peak(&self) -> usize {
        self.peak.get()
    }
}

impl BufferHeap for ArenaHeap {
    fn allocate(&self, bytes: usize) -> Option<Vec<u32>> {
        let words = words_for(bytes);
        let size = words * 4;
        if size > self.available() {
            log::warn!(
                "arena heap refused {} bytes ({} of {} in use)",
                size,
                self.used.get(),
                self.budget
            );
            return None;
        }
        let block = zeroed_block(words)?;
        let used = self.used.get() + size;
        self.used.set(used);
        self.peak.set(self.peak.get().max(used));
        Some(block)
    }

    fn release(&self, block: Vec<u32>) {
        let size = block.len() * 4;
        self.used.set(self.used.get().saturating_sub(size));
    }

    fn bytes_in_use(&self) -> usize {
        self.used.get()
    }
}

// ============================================================================
// Tests
// ============================================================================
