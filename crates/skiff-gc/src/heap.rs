//! Heap layout manager and mutator services
//!
//! One contiguous arena of words is partitioned bottom-up into the stack
//! cache, two ephemeral semispaces, the static area, and two tenured
//! semispaces. The heap owns the arena, the root registers, and the shared
//! state table; the mutator allocates by bumping the published ephemeral
//! top and records tenured-to-ephemeral stores through the `remember`
//! write barrier.

use crate::collector::{trap, TrapKind};
use crate::defaults::{
    round_up_doubleword, MIN_EPHEMERAL_BYTES, MIN_STACK_BYTES, MIN_STATIC_BYTES,
    MIN_TENURED_BYTES, WORD_BYTES,
};
use crate::roots::RootSet;
use crate::space::{Region, Semispace};
use crate::state::{StateIndex, StateTable};
use crate::word::{HeaderKind, Tag, Word};

/// Requested region sizes, in bytes. Undersized requests are clamped up to
/// the compiled-in minimums, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Size of the static area.
    pub static_bytes: usize,
    /// Size of one tenured semispace.
    pub tenured_bytes: usize,
    /// Size of one ephemeral semispace.
    pub ephemeral_bytes: usize,
    /// Watermark measured from the bottom of the ephemeral space; live data
    /// above it after a minor collection forces the next collection to be
    /// major. Clamped into `[0, ephemeral_bytes]`.
    pub watermark_bytes: usize,
    /// Size of the stack cache.
    pub stack_bytes: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            static_bytes: 64 * 1024,
            tenured_bytes: 1024 * 1024,
            ephemeral_bytes: 256 * 1024,
            watermark_bytes: 128 * 1024,
            stack_bytes: 64 * 1024,
        }
    }
}

/// Errors that can occur while initializing the heap.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    /// The backing arena could not be allocated. No partial state remains.
    #[error("out of memory allocating {requested} bytes for the heap arena")]
    OutOfMemory {
        /// Total arena size that was requested.
        requested: usize,
    },
}

/// The collector-managed heap.
pub struct Heap {
    pub(crate) arena: Box<[Word]>,
    pub(crate) stack: Region,
    pub(crate) e_active: Semispace,
    pub(crate) e_inactive: Semispace,
    pub(crate) static_area: Region,
    pub(crate) t_active: Semispace,
    pub(crate) t_inactive: Semispace,
    /// Watermark distance from the ephemeral base, in words.
    pub(crate) watermark_words: usize,
    /// Transaction-list cutoff: word index of the first free slot below
    /// the live entries. `t_active.limit - 1` means the list is empty.
    pub(crate) trans: usize,
    pub(crate) roots: RootSet,
    pub(crate) state: StateTable,
}

impl Heap {
    /// Allocate and partition the heap.
    ///
    /// Sizes are rounded up to double-word multiples and clamped to the
    /// compiled-in minimums; the watermark is clamped into the ephemeral
    /// size. On allocation failure no partial state is created.
    pub fn new(config: HeapConfig) -> Result<Self, InitError> {
        let s_size = round_up_doubleword(config.static_bytes).max(MIN_STATIC_BYTES);
        let t_size = round_up_doubleword(config.tenured_bytes).max(MIN_TENURED_BYTES);
        let e_size = round_up_doubleword(config.ephemeral_bytes).max(MIN_EPHEMERAL_BYTES);
        let stack_size = round_up_doubleword(config.stack_bytes).max(MIN_STACK_BYTES);
        let e_mark = round_up_doubleword(config.watermark_bytes).min(e_size);

        let total_bytes = stack_size + 2 * e_size + s_size + 2 * t_size;
        let total_words = total_bytes / WORD_BYTES;

        let mut backing: Vec<Word> = Vec::new();
        backing
            .try_reserve_exact(total_words)
            .map_err(|_| InitError::OutOfMemory {
                requested: total_bytes,
            })?;
        backing.resize(total_words, Word::ZERO);

        // Partition bottom-up: stack cache, ephemeral pair, static area,
        // tenured pair.
        let mut p = 0;
        let stack = Region::new(p, p + stack_size / WORD_BYTES);
        p = stack.limit;

        let e_active = Semispace::new(p, p + e_size / WORD_BYTES);
        p = e_active.limit;
        let e_inactive = Semispace::new(p, p + e_size / WORD_BYTES);
        p = e_inactive.limit;

        let static_area = Region::new(p, p + s_size / WORD_BYTES);
        p = static_area.limit;

        let t_active = Semispace::new(p, p + t_size / WORD_BYTES);
        p = t_active.limit;
        let t_inactive = Semispace::new(p, p + t_size / WORD_BYTES);

        let trans = t_active.limit - 1;

        let mut heap = Self {
            arena: backing.into_boxed_slice(),
            stack,
            e_active,
            e_inactive,
            static_area,
            t_active,
            t_inactive,
            watermark_words: e_mark / WORD_BYTES,
            trans,
            roots: RootSet::new(),
            state: StateTable::new(),
        };
        heap.publish();
        Ok(heap)
    }

    /// Re-read the mutator-owned cursors from the state table. The mutator
    /// advances the ephemeral and tenured tops and lowers the transaction
    /// cutoff between collections.
    pub(crate) fn resync(&mut self) {
        self.e_active.top = self.state.get(StateIndex::EphemeralTop) as usize / WORD_BYTES;
        self.t_active.top = self.state.get(StateIndex::TenuredTop) as usize / WORD_BYTES;
        self.trans = self.state.get(StateIndex::TenuredTrans) as usize / WORD_BYTES;
    }

    /// Publish every region bound into the state table.
    pub(crate) fn publish(&mut self) {
        let b = |words: usize| (words * WORD_BYTES) as u32;
        let mark = self.e_active.base + self.watermark_words;

        self.state.set(StateIndex::EphemeralBase, b(self.e_active.base));
        self.state.set(StateIndex::EphemeralTop, b(self.e_active.top));
        self.state.set(StateIndex::EphemeralMark, b(mark));
        self.state.set(StateIndex::EphemeralMax, b(self.e_active.limit));

        self.state.set(StateIndex::TenuredBase, b(self.t_active.base));
        self.state.set(StateIndex::TenuredTop, b(self.t_active.top));
        self.state.set(StateIndex::TenuredMax, b(self.t_active.limit));
        self.state.set(StateIndex::TenuredTrans, b(self.trans));

        self.state.set(StateIndex::StaticBase, b(self.static_area.base));
        self.state.set(StateIndex::StaticMax, b(self.static_area.limit));
        self.state.set(StateIndex::StackBase, b(self.stack.base));
        self.state.set(StateIndex::StackMax, b(self.stack.limit));

        self.state.set(StateIndex::LoMem, 0);
        self.state.set(StateIndex::HiMem, b(self.arena.len()));
    }

    /// Live words in both generations plus the transaction list.
    /// Accounting only; never a scheduling input.
    pub(crate) fn words_used(&self) -> usize {
        self.e_active.live_words()
            + self.t_active.live_words()
            + self.transaction_words_internal()
    }

    fn transaction_words_internal(&self) -> usize {
        (self.t_active.limit - 1) - self.trans
    }

    /// Number of live transaction-list entries.
    pub fn transaction_count(&self) -> usize {
        let trans = self.state.get(StateIndex::TenuredTrans) as usize / WORD_BYTES;
        (self.t_active.limit - 1) - trans
    }

    /// Transaction-list entry `i`, counted from the top of tenured space.
    pub fn transaction_entry(&self, i: usize) -> Word {
        debug_assert!(i < self.transaction_count());
        self.arena[self.t_active.limit - 1 - i]
    }

    // ----- Roots -----

    /// Read root register `i`.
    pub fn root(&self, i: usize) -> Word {
        self.roots.get(i)
    }

    /// Write root register `i`.
    pub fn set_root(&mut self, i: usize, w: Word) {
        self.roots.set(i, w);
    }

    /// The shared state table.
    pub fn state(&self) -> &StateTable {
        &self.state
    }

    // ----- Ephemeral allocation -----

    fn alloc_ephemeral(&mut self, words: usize) -> Option<usize> {
        let top = self.state.get(StateIndex::EphemeralTop) as usize / WORD_BYTES;
        if top + words > self.e_active.limit {
            return None;
        }
        self.state
            .set(StateIndex::EphemeralTop, ((top + words) * WORD_BYTES) as u32);
        Some(top)
    }

    /// Allocate a pair in ephemeral space. `None` means the space is
    /// exhausted and the caller must collect and retry.
    pub fn alloc_pair(&mut self, car: Word, cdr: Word) -> Option<Word> {
        let at = self.alloc_ephemeral(2)?;
        self.arena[at] = car;
        self.arena[at + 1] = cdr;
        Some(Word::pair_pointer((at * WORD_BYTES) as u32))
    }

    /// Allocate a vector of `len` tagged words, each set to `fill`.
    pub fn alloc_vector(&mut self, len: usize, fill: Word) -> Option<Word> {
        let at = self.alloc_vector_like(HeaderKind::Vector, len, fill)?;
        Some(Word::vector_pointer((at * WORD_BYTES) as u32))
    }

    /// Allocate a procedure object with `len` tagged slots, each `fill`.
    pub fn alloc_procedure(&mut self, len: usize, fill: Word) -> Option<Word> {
        let at = self.alloc_vector_like(HeaderKind::Procedure, len, fill)?;
        Some(Word::procedure_pointer((at * WORD_BYTES) as u32))
    }

    fn alloc_vector_like(&mut self, kind: HeaderKind, len: usize, fill: Word) -> Option<usize> {
        let total = object_words(1 + len);
        let at = self.alloc_ephemeral(total)?;
        self.arena[at] = Word::header(kind, (len * WORD_BYTES) as u32);
        for i in 0..len {
            self.arena[at + 1 + i] = fill;
        }
        if total > 1 + len {
            self.arena[at + 1 + len] = Word::ZERO;
        }
        Some(at)
    }

    /// Allocate a bytevector holding a copy of `bytes`.
    pub fn alloc_bytevector(&mut self, bytes: &[u8]) -> Option<Word> {
        let data_words = (bytes.len() + WORD_BYTES - 1) / WORD_BYTES;
        let total = object_words(1 + data_words);
        let at = self.alloc_ephemeral(total)?;
        self.arena[at] = Word::header(HeaderKind::Bytevector, bytes.len() as u32);
        for i in 0..data_words {
            let mut chunk = [0u8; WORD_BYTES];
            let start = i * WORD_BYTES;
            let end = (start + WORD_BYTES).min(bytes.len());
            chunk[..end - start].copy_from_slice(&bytes[start..end]);
            self.arena[at + 1 + i] = Word::from_raw(u32::from_le_bytes(chunk));
        }
        if total > 1 + data_words {
            self.arena[at + 1 + data_words] = Word::ZERO;
        }
        Some(Word::bytevector_pointer((at * WORD_BYTES) as u32))
    }

    // ----- Tenured allocation (heap loading and tests) -----

    fn alloc_tenured(&mut self, words: usize) -> Option<usize> {
        let top = self.state.get(StateIndex::TenuredTop) as usize / WORD_BYTES;
        let trans = self.state.get(StateIndex::TenuredTrans) as usize / WORD_BYTES;
        // The transaction list grows down from the limit; objects may not
        // collide with it.
        if top + words > trans + 1 {
            return None;
        }
        self.state
            .set(StateIndex::TenuredTop, ((top + words) * WORD_BYTES) as u32);
        Some(top)
    }

    /// Allocate a pair directly in tenured space.
    pub fn alloc_tenured_pair(&mut self, car: Word, cdr: Word) -> Option<Word> {
        let at = self.alloc_tenured(2)?;
        self.arena[at] = car;
        self.arena[at + 1] = cdr;
        Some(Word::pair_pointer((at * WORD_BYTES) as u32))
    }

    /// Allocate a vector of `len` tagged words directly in tenured space.
    pub fn alloc_tenured_vector(&mut self, len: usize, fill: Word) -> Option<Word> {
        let total = object_words(1 + len);
        let at = self.alloc_tenured(total)?;
        self.arena[at] = Word::header(HeaderKind::Vector, (len * WORD_BYTES) as u32);
        for i in 0..len {
            self.arena[at + 1 + i] = fill;
        }
        if total > 1 + len {
            self.arena[at + 1 + len] = Word::ZERO;
        }
        Some(Word::vector_pointer((at * WORD_BYTES) as u32))
    }

    // ----- Write barrier -----

    /// Record a tenured location that now holds an ephemeral pointer.
    ///
    /// This is the mutator's write-barrier obligation: every store of an
    /// ephemeral pointer into a tenured object must push the tenured
    /// object's tagged pointer here, or the minor collector will reclaim
    /// the referent out from under it.
    pub fn remember(&mut self, entry: Word) {
        let trans = self.state.get(StateIndex::TenuredTrans) as usize / WORD_BYTES;
        let top = self.state.get(StateIndex::TenuredTop) as usize / WORD_BYTES;
        if trans < top {
            trap(TrapKind::TenuredOverflow);
        }
        self.arena[trans] = entry;
        self.state
            .set(StateIndex::TenuredTrans, ((trans - 1) * WORD_BYTES) as u32);
    }

    // ----- Object accessors -----

    /// The first field of a pair.
    pub fn car(&self, pair: Word) -> Word {
        debug_assert_eq!(pair.tag(), Tag::Pair);
        self.arena[pair.word_index()]
    }

    /// The second field of a pair.
    pub fn cdr(&self, pair: Word) -> Word {
        debug_assert_eq!(pair.tag(), Tag::Pair);
        self.arena[pair.word_index() + 1]
    }

    /// Store into the first field of a pair. The write barrier is the
    /// caller's obligation when `pair` is tenured and `w` is ephemeral.
    pub fn set_car(&mut self, pair: Word, w: Word) {
        debug_assert_eq!(pair.tag(), Tag::Pair);
        self.arena[pair.word_index()] = w;
    }

    /// Store into the second field of a pair. Write barrier as `set_car`.
    pub fn set_cdr(&mut self, pair: Word, w: Word) {
        debug_assert_eq!(pair.tag(), Tag::Pair);
        self.arena[pair.word_index() + 1] = w;
    }

    /// Number of tagged slots in a vector or procedure.
    pub fn vector_length(&self, v: Word) -> usize {
        let hdr = self.arena[v.word_index()];
        debug_assert!(hdr.is_header());
        hdr.header_payload_bytes() as usize / WORD_BYTES
    }

    /// Slot `i` of a vector or procedure.
    pub fn vector_ref(&self, v: Word, i: usize) -> Word {
        debug_assert!(i < self.vector_length(v));
        self.arena[v.word_index() + 1 + i]
    }

    /// Store into slot `i` of a vector or procedure. Write barrier as
    /// `set_car`.
    pub fn vector_set(&mut self, v: Word, i: usize, w: Word) {
        debug_assert!(i < self.vector_length(v));
        self.arena[v.word_index() + 1 + i] = w;
    }

    /// Byte length of a bytevector.
    pub fn bytevector_length(&self, bv: Word) -> usize {
        let hdr = self.arena[bv.word_index()];
        debug_assert_eq!(hdr.header_kind(), Some(HeaderKind::Bytevector));
        hdr.header_payload_bytes() as usize
    }

    /// Byte `i` of a bytevector.
    pub fn bytevector_ref(&self, bv: Word, i: usize) -> u8 {
        debug_assert!(i < self.bytevector_length(bv));
        let word = self.arena[bv.word_index() + 1 + i / WORD_BYTES];
        word.raw().to_le_bytes()[i % WORD_BYTES]
    }

    /// Whether the byte offset of `w` lands in the active ephemeral space.
    pub fn in_ephemeral(&self, w: Word) -> bool {
        w.is_ptr() && self.e_active.contains(w.offset())
    }

    /// Whether the byte offset of `w` lands in the active tenured space.
    pub fn in_tenured(&self, w: Word) -> bool {
        w.is_ptr() && self.t_active.contains(w.offset())
    }
}

/// Total words an object of `used` words occupies after double-word padding.
#[inline]
pub(crate) fn object_words(used: usize) -> usize {
    (used + 1) & !1
}
