//! Root registers
//!
//! The root set is a fixed contiguous range of global registers. Every
//! collection starts its reachability scan from all of them; the mutator
//! stores any value it needs to survive a collection in one of these
//! registers before allocation can trigger one.

use crate::defaults::ROOT_COUNT;
use crate::word::Word;

/// Fixed array of global root registers.
#[derive(Debug, Clone)]
pub struct RootSet {
    regs: [Word; ROOT_COUNT],
}

impl RootSet {
    /// Create a root set with every register holding the empty list.
    pub fn new() -> Self {
        Self {
            regs: [Word::NIL; ROOT_COUNT],
        }
    }

    /// Read root register `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Word {
        self.regs[i]
    }

    /// Write root register `i`.
    #[inline]
    pub fn set(&mut self, i: usize, w: Word) {
        self.regs[i] = w;
    }

    /// Number of root registers.
    #[inline]
    pub fn len(&self) -> usize {
        ROOT_COUNT
    }

    /// Always false; the register file has a fixed size.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All registers, for the image writer.
    pub(crate) fn as_slice(&self) -> &[Word] {
        &self.regs
    }

    /// All registers, for the collectors and the image loader.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [Word] {
        &mut self.regs
    }
}

impl Default for RootSet {
    fn default() -> Self {
        Self::new()
    }
}
