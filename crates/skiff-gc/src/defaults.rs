//! Default constants for collector configuration.
//!
//! Centralizes the compiled-in minimum region sizes and alignment rules
//! shared by heap.rs, collector.rs, and image.rs.

/// Bytes per machine word.
pub const WORD_BYTES: usize = 4;

/// Bytes per double word. Every heap object starts on a double-word boundary.
pub const DOUBLEWORD_BYTES: usize = 8;

/// Minimum size of the static area, in bytes.
pub const MIN_STATIC_BYTES: usize = 256;

/// Minimum size of one tenured semispace, in bytes.
pub const MIN_TENURED_BYTES: usize = 1024;

/// Minimum size of one ephemeral semispace, in bytes.
pub const MIN_EPHEMERAL_BYTES: usize = 1024;

/// Minimum size of the stack cache, in bytes.
pub const MIN_STACK_BYTES: usize = 256;

/// Number of root registers scanned on every collection.
pub const ROOT_COUNT: usize = 32;

/// Round a byte count up to the next word multiple.
#[inline]
pub const fn round_up_word(bytes: usize) -> usize {
    (bytes + WORD_BYTES - 1) & !(WORD_BYTES - 1)
}

/// Round a byte count up to the next double-word multiple.
#[inline]
pub const fn round_up_doubleword(bytes: usize) -> usize {
    (bytes + DOUBLEWORD_BYTES - 1) & !(DOUBLEWORD_BYTES - 1)
}
