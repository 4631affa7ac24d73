//! Tagged machine words
//!
//! Every Scheme value the collector handles is one 32-bit word whose low
//! three bits select the type. The same bit layout is the persisted heap
//! image format, so the raw representation is fixed and all bit fiddling
//! stays inside this module.
//!
//! Layout in memory:
//! ```text
//! fixnum       vvvvvvvv vvvvvvvv vvvvvvvv vvvvvv00   (also tag 100)
//! immediate    vvvvvvvv vvvvvvvv vvvvvvvv vvvvvv10   (also tag 110)
//! pair ptr     oooooooo oooooooo oooooooo ooooo001
//! vector ptr   oooooooo oooooooo oooooooo ooooo011
//! bytevec ptr  oooooooo oooooooo oooooooo ooooo101
//! proc ptr     oooooooo oooooooo oooooooo ooooo111
//! header       tsssssss ssssssss ssssssss kkk000 10   (t = traced bit,
//!                                                      s = payload bytes,
//!                                                      k = object kind)
//! ```
//! Pointer words carry byte offsets from the arena base, never native
//! addresses. Objects are double-word aligned, so the three tag bits of a
//! pointer are always free.

use crate::defaults::WORD_BYTES;

/// Mask extracting the three tag bits.
pub const TAG_MASK: u32 = 0x0000_0007;

const PAIR_TAG: u32 = 0x1;
const VEC_TAG: u32 = 0x3;
const BVEC_TAG: u32 = 0x5;
const PROC_TAG: u32 = 0x7;

/// Mask and signature identifying header words: `(w & 0x83) == 0x82`.
const ISHDR_MASK: u32 = 0x0000_0083;
const HDR_SIGN: u32 = 0x0000_0082;

/// Mask extracting the header kind bits.
const HDR_KIND_MASK: u32 = 0x0000_00E3;

const VEC_HDR: u32 = 0xA2;
const BV_HDR: u32 = 0xC2;
const PROC_HDR: u32 = 0xFE;

/// Transient traced bit in vector-like headers, set and cleared by the
/// minor collector while walking the transaction list.
const TRACED_BIT: u32 = 0x8000_0000;

/// One tagged machine word.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Word(u32);

/// Closed classification of a word by its tag bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tag {
    /// Small exact integer, stored shifted left by two.
    Fixnum,
    /// Non-pointer constant (booleans, nil, characters, headers).
    Immediate,
    /// Pointer to a two-word pair.
    Pair,
    /// Pointer to a vector (header + tagged words).
    Vector,
    /// Pointer to a bytevector (header + raw bytes).
    Bytevector,
    /// Pointer to a procedure (header + tagged words).
    Procedure,
}

/// Kind of a vector-like object, read from its header word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeaderKind {
    /// Vector of tagged words.
    Vector,
    /// Bytevector: raw bytes, never scanned as pointers.
    Bytevector,
    /// Procedure: code and environment slots, scanned as tagged words.
    Procedure,
}

impl HeaderKind {
    fn bits(self) -> u32 {
        match self {
            HeaderKind::Vector => VEC_HDR,
            HeaderKind::Bytevector => BV_HDR,
            HeaderKind::Procedure => PROC_HDR,
        }
    }
}

impl Word {
    /// The false constant.
    pub const FALSE: Word = Word(0x02);
    /// The true constant.
    pub const TRUE: Word = Word(0x06);
    /// The empty list constant.
    pub const NIL: Word = Word(0x0A);
    /// An all-zero word (fixnum zero, also the padding filler).
    pub const ZERO: Word = Word(0);

    /// Wrap a raw 32-bit word.
    #[inline]
    pub const fn from_raw(raw: u32) -> Word {
        Word(raw)
    }

    /// The raw 32-bit representation.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Make a fixnum word.
    #[inline]
    pub const fn fixnum(n: i32) -> Word {
        Word((n << 2) as u32)
    }

    /// The integer value of a fixnum word.
    #[inline]
    pub const fn as_fixnum(self) -> i32 {
        (self.0 as i32) >> 2
    }

    /// A word is a pointer iff its low bit is set.
    #[inline]
    pub const fn is_ptr(self) -> bool {
        self.0 & 0x1 != 0
    }

    /// Classify a word by its tag bits.
    #[inline]
    pub fn tag(self) -> Tag {
        match self.0 & TAG_MASK {
            0x0 | 0x4 => Tag::Fixnum,
            0x2 | 0x6 => Tag::Immediate,
            PAIR_TAG => Tag::Pair,
            VEC_TAG => Tag::Vector,
            BVEC_TAG => Tag::Bytevector,
            PROC_TAG => Tag::Procedure,
            _ => unreachable!(),
        }
    }

    /// Byte offset carried by a pointer word.
    #[inline]
    pub const fn offset(self) -> u32 {
        self.0 & !TAG_MASK
    }

    /// Word index into the arena for a pointer word.
    #[inline]
    pub const fn word_index(self) -> usize {
        (self.offset() as usize) / WORD_BYTES
    }

    /// A pointer with the same tag as `self` but a new byte offset.
    #[inline]
    pub const fn with_offset(self, offset: u32) -> Word {
        debug_assert!(offset & TAG_MASK == 0);
        Word(offset | (self.0 & TAG_MASK))
    }

    /// Make a pair pointer from a double-word-aligned byte offset.
    #[inline]
    pub const fn pair_pointer(offset: u32) -> Word {
        Word(offset | PAIR_TAG)
    }

    /// Make a vector pointer from a double-word-aligned byte offset.
    #[inline]
    pub const fn vector_pointer(offset: u32) -> Word {
        Word(offset | VEC_TAG)
    }

    /// Make a bytevector pointer from a double-word-aligned byte offset.
    #[inline]
    pub const fn bytevector_pointer(offset: u32) -> Word {
        Word(offset | BVEC_TAG)
    }

    /// Make a procedure pointer from a double-word-aligned byte offset.
    #[inline]
    pub const fn procedure_pointer(offset: u32) -> Word {
        Word(offset | PROC_TAG)
    }

    /// Make a header word for a vector-like object with `payload_bytes` of
    /// data following it. The traced bit starts clear.
    #[inline]
    pub fn header(kind: HeaderKind, payload_bytes: u32) -> Word {
        debug_assert!(payload_bytes < (1 << 23));
        Word((payload_bytes << 8) | kind.bits())
    }

    /// A word is a header iff it has the header bit layout.
    #[inline]
    pub const fn is_header(self) -> bool {
        self.0 & ISHDR_MASK == HDR_SIGN
    }

    /// Kind of the object this header begins, if `self` is a header.
    #[inline]
    pub fn header_kind(self) -> Option<HeaderKind> {
        if !self.is_header() {
            return None;
        }
        match self.0 & HDR_KIND_MASK {
            VEC_HDR => Some(HeaderKind::Vector),
            BV_HDR => Some(HeaderKind::Bytevector),
            x if x == PROC_HDR & HDR_KIND_MASK => Some(HeaderKind::Procedure),
            _ => None,
        }
    }

    /// Payload byte size stored in a header word, ignoring the traced bit.
    #[inline]
    pub const fn header_payload_bytes(self) -> u32 {
        (self.0 & !TRACED_BIT) >> 8
    }

    /// Payload size in whole words (bytevector payloads round up).
    #[inline]
    pub const fn header_payload_words(self) -> usize {
        ((self.header_payload_bytes() as usize) + WORD_BYTES - 1) / WORD_BYTES
    }

    /// Is the transient traced bit set?
    #[inline]
    pub const fn is_traced(self) -> bool {
        self.0 & TRACED_BIT != 0
    }

    /// This header with the traced bit set.
    #[inline]
    pub const fn set_traced(self) -> Word {
        Word(self.0 | TRACED_BIT)
    }

    /// This header with the traced bit clear.
    #[inline]
    pub const fn clear_traced(self) -> Word {
        Word(self.0 & !TRACED_BIT)
    }
}

impl std::fmt::Debug for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_header() {
            write!(
                f,
                "Word({:#010x}, header {:?}, {} bytes)",
                self.0,
                self.header_kind(),
                self.header_payload_bytes()
            )
        } else {
            write!(f, "Word({:#010x}, {:?})", self.0, self.tag())
        }
    }
}
