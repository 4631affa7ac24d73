//! Skiff Generational Garbage Collector
//!
//! A stop-and-copy, two-generation collector for a tagged-word Scheme
//! heap:
//! - Tagged 32-bit word representation (fixnums, immediates, pairs,
//!   vectors, bytevectors, procedures)
//! - Ephemeral generation collected with a Cheney scan; frequent and
//!   cheap, cost proportional to live data
//! - Tenured generation collected rarely, driven by a watermark on
//!   post-collection ephemeral occupancy
//! - Transaction list recording tenured objects that point into the
//!   ephemeral generation (the mutator's write-barrier obligation)
//! - Position-independent heap images with checksums
//!
//! The heap is one contiguous arena; pointer words carry byte offsets
//! from its base, so the whole collector is safe Rust and heap images
//! load anywhere the geometry matches.
//!
//! # Example
//!
//! ```rust
//! use skiff_gc::{CollectKind, Collector, HeapConfig, Word};
//!
//! let mut gc = Collector::new(HeapConfig::default()).unwrap();
//!
//! // Build the list (1 2) and root it. The root register keeps the
//! // tail alive in case the second allocation triggers a collection.
//! let tail = gc.alloc_pair(Word::fixnum(2), Word::NIL);
//! gc.heap_mut().set_root(0, tail);
//! let list = gc.alloc_pair(Word::fixnum(1), gc.heap().root(0));
//! gc.heap_mut().set_root(0, list);
//!
//! gc.collect(CollectKind::Minor);
//!
//! let list = gc.heap().root(0);
//! assert_eq!(gc.heap().car(list), Word::fixnum(1));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod collector;
pub mod defaults;
pub mod heap;
pub mod image;
pub mod roots;
pub mod state;
pub mod word;

mod forward;
mod space;

pub use collector::{trap, CollectKind, Collector, GcStats, TrapKind};
pub use heap::{Heap, HeapConfig, InitError};
pub use image::{ImageError, IMAGE_MAGIC, IMAGE_VERSION};
pub use roots::RootSet;
pub use state::{StateIndex, StateTable, STATE_WORDS};
pub use word::{HeaderKind, Tag, Word};
