//! Shared state table
//!
//! The state table is the sole communication channel between the mutator,
//! the OS-binding layer, and the collector: an addressable array of machine
//! words holding every region bound and all collection statistics. The
//! mutator bump-allocates by advancing the ephemeral top and pushes write
//! barrier entries by lowering the transaction cutoff; the collector
//! resynchronizes those cursors at the start of every collection and
//! republishes the whole table afterwards.
//!
//! All bounds are byte offsets from the arena base. `*Max` entries are
//! exclusive (one past the last byte of the region).

/// Named indices into the shared state table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
pub enum StateIndex {
    /// Base of the active ephemeral semispace.
    EphemeralBase = 0,
    /// Allocation top of the active ephemeral semispace (mutator-owned).
    EphemeralTop,
    /// Watermark position inside the active ephemeral semispace.
    EphemeralMark,
    /// Exclusive limit of the active ephemeral semispace.
    EphemeralMax,
    /// Base of the active tenured semispace.
    TenuredBase,
    /// Allocation top of the active tenured semispace (mutator-owned).
    TenuredTop,
    /// Exclusive limit of the active tenured semispace.
    TenuredMax,
    /// Transaction-list cutoff: the first free slot below the live
    /// entries, which grow downward from the tenured limit (mutator-owned).
    TenuredTrans,
    /// Base of the static area.
    StaticBase,
    /// Exclusive limit of the static area.
    StaticMax,
    /// Base of the stack cache.
    StackBase,
    /// Exclusive limit of the stack cache.
    StackMax,
    /// Lowest byte offset of collector-managed memory.
    LoMem,
    /// Exclusive highest byte offset of collector-managed memory.
    HiMem,
    /// Total words reclaimed by all collections.
    WordsCollected,
    /// Total words allocated by the mutator across all cycles.
    WordsAllocated,
    /// Number of minor collections run.
    MinorCollections,
    /// Number of major collections run.
    MajorCollections,
}

/// Number of words in the state table.
pub const STATE_WORDS: usize = 18;

/// The shared state table.
#[derive(Debug, Clone)]
pub struct StateTable {
    words: [u32; STATE_WORDS],
}

impl StateTable {
    /// Create a zeroed table.
    pub fn new() -> Self {
        Self {
            words: [0; STATE_WORDS],
        }
    }

    /// Read one entry.
    #[inline]
    pub fn get(&self, index: StateIndex) -> u32 {
        self.words[index as usize]
    }

    /// Write one entry.
    #[inline]
    pub fn set(&mut self, index: StateIndex, value: u32) {
        self.words[index as usize] = value;
    }

    /// Read by raw index, for callers that treat the table as an array.
    #[inline]
    pub fn get_raw(&self, index: usize) -> u32 {
        self.words[index]
    }

    /// The whole table as a word slice.
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }
}

impl Default for StateTable {
    fn default() -> Self {
        Self::new()
    }
}
