//! Object forwarding engine
//!
//! `forward` evacuates one object from a source space into the destination
//! cursor and installs a forwarding pointer at the old location. It is the
//! single primitive both collectors drive: idempotent, never copies an
//! object twice, and fails fast if the destination space would overflow.

use crate::collector::{trap, TrapKind};
use crate::defaults::{round_up_doubleword, WORD_BYTES};
use crate::space::Semispace;
use crate::word::{Tag, Word};

/// Copy cursor into the destination space of the running collection.
#[derive(Debug)]
pub(crate) struct DestCursor {
    /// Next free word index in the destination space.
    pub top: usize,
    /// Exclusive word limit of the destination space.
    pub limit: usize,
    /// Trap raised if a copy would pass the limit.
    pub overflow: TrapKind,
}

impl DestCursor {
    pub fn new(space: &Semispace, overflow: TrapKind) -> Self {
        Self {
            top: space.base,
            limit: space.limit,
            overflow,
        }
    }
}

/// Forward one word against the source space `src`.
///
/// Returns:
/// - `w` unchanged if it is not a pointer, or points outside `src`;
/// - the installed forwarding pointer if the referent was already
///   evacuated (O(1), no second copy);
/// - otherwise a pointer to a fresh copy of the referent at the
///   destination cursor, after writing the forwarding pointer over the
///   referent's first word.
pub(crate) fn forward(arena: &mut [Word], w: Word, src: &Semispace, dest: &mut DestCursor) -> Word {
    if !w.is_ptr() {
        return w;
    }
    if !src.contains(w.offset()) {
        return w;
    }

    let old = w.word_index();
    let first = arena[old];
    if first.is_ptr() && !src.contains(first.offset()) {
        // First word is a pointer out of the source space: the referent
        // was already forwarded and this is its new location.
        return first;
    }

    // Copy the object. A pair is two raw words; a vector-like object is a
    // header plus its payload rounded up to a word, zero-padded to a
    // double word.
    let (copy_words, total_words) = match w.tag() {
        Tag::Pair => (2, 2),
        _ => {
            let body_bytes = first.header_payload_bytes() as usize + WORD_BYTES;
            let copy = (body_bytes + WORD_BYTES - 1) / WORD_BYTES;
            (copy, round_up_doubleword(body_bytes) / WORD_BYTES)
        }
    };

    if dest.top + total_words > dest.limit {
        trap(dest.overflow);
    }

    let new = dest.top;
    arena.copy_within(old..old + copy_words, new);
    if total_words > copy_words {
        arena[new + copy_words] = Word::ZERO;
    }
    dest.top += total_words;

    let forwarded = w.with_offset((new * WORD_BYTES) as u32);
    arena[old] = forwarded;
    forwarded
}
