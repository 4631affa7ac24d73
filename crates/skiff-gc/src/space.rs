//! Semispaces and fixed regions over the heap arena.
//!
//! A `Semispace` is a contiguous run of arena words with a bump cursor.
//! Generation flips swap two `Semispace` values; word offsets inside the
//! arena never change, which is what makes forwarding pointers and heap
//! images position-independent.

use crate::defaults::WORD_BYTES;

/// A fixed region of the arena with no allocation cursor (stack cache,
/// static area).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Region {
    /// First word index of the region.
    pub base: usize,
    /// One past the last word index of the region.
    pub limit: usize,
}

impl Region {
    pub fn new(base: usize, limit: usize) -> Region {
        Region { base, limit }
    }

    pub fn words(&self) -> usize {
        self.limit - self.base
    }
}

/// One of a generation's two paired spaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Semispace {
    /// First word index of the space.
    pub base: usize,
    /// Next free word index; objects live in `base..top`.
    pub top: usize,
    /// One past the last word index of the space.
    pub limit: usize,
}

impl Semispace {
    pub fn new(base: usize, limit: usize) -> Semispace {
        Semispace { base, top: base, limit }
    }

    /// Does a pointer byte offset land inside this space?
    #[inline]
    pub fn contains(&self, byte_offset: u32) -> bool {
        let idx = byte_offset as usize / WORD_BYTES;
        idx >= self.base && idx < self.limit
    }

    /// Live words between base and top.
    #[inline]
    pub fn live_words(&self) -> usize {
        self.top - self.base
    }

    /// Empty the space.
    #[inline]
    pub fn reset(&mut self) {
        self.top = self.base;
    }
}
