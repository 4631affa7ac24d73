//! Heap image persistence
//!
//! A heap image is the complete live state of the heap after a major
//! collection: geometry, root registers, the static area, and the live
//! tenured data. Because pointer words carry arena byte offsets rather
//! than native addresses, an image written on one machine loads on any
//! other, provided the heap was initialized with the same geometry.
//!
//! Wire format, all fields little-endian u32:
//!
//! ```text
//! magic | version | body length in bytes | body | crc32 of body
//! ```
//!
//! The body is geometry (region sizes, watermark, active semispace
//! indices), the root registers, the whole static area, and the live
//! tenured words.

use std::io::{Read, Write};

use crc32fast::Hasher;

use crate::collector::{CollectKind, Collector};
use crate::defaults::{ROOT_COUNT, WORD_BYTES};
use crate::word::Word;

/// Identifies a heap image file.
pub const IMAGE_MAGIC: u32 = u32::from_le_bytes(*b"SKIF");

/// Current image format version.
pub const IMAGE_VERSION: u32 = 1;

/// Errors that can occur while writing or reading a heap image.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Underlying I/O failure.
    #[error("image I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the image magic.
    #[error("not a heap image (bad magic {found:#010x})")]
    InvalidMagic {
        /// The word found where the magic was expected.
        found: u32,
    },

    /// The image was written by an incompatible format version.
    #[error("unsupported image version {found} (expected {IMAGE_VERSION})")]
    IncompatibleVersion {
        /// The version recorded in the image.
        found: u32,
    },

    /// The image was written by a heap with different region sizes, so
    /// its pointer offsets are meaningless here.
    #[error("image geometry does not match this heap")]
    GeometryMismatch,

    /// The body checksum does not match.
    #[error("image checksum mismatch (expected {expected:#010x}, found {found:#010x})")]
    ChecksumMismatch {
        /// Checksum recorded in the image.
        expected: u32,
        /// Checksum of the bytes actually read.
        found: u32,
    },
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// The five region sizes plus which semispace of each pair is active.
#[derive(Debug, PartialEq, Eq)]
struct Geometry {
    stack_bytes: u32,
    ephemeral_bytes: u32,
    static_bytes: u32,
    tenured_bytes: u32,
    watermark_bytes: u32,
    e_active_low: bool,
    t_active_low: bool,
}

impl Collector {
    fn geometry(&self) -> Geometry {
        let heap = &self.heap;
        Geometry {
            stack_bytes: (heap.stack.words() * WORD_BYTES) as u32,
            ephemeral_bytes: ((heap.e_active.limit - heap.e_active.base) * WORD_BYTES) as u32,
            static_bytes: (heap.static_area.words() * WORD_BYTES) as u32,
            tenured_bytes: ((heap.t_active.limit - heap.t_active.base) * WORD_BYTES) as u32,
            watermark_bytes: (heap.watermark_words * WORD_BYTES) as u32,
            e_active_low: heap.e_active.base < heap.e_inactive.base,
            t_active_low: heap.t_active.base < heap.t_inactive.base,
        }
    }

    /// Write a heap image.
    ///
    /// Runs a major collection first, so the image holds exactly the live
    /// data: the ephemeral generation and the transaction list are empty
    /// and everything reachable sits in fresh tenured space.
    pub fn dump_image<W: Write>(&mut self, out: &mut W) -> Result<(), ImageError> {
        self.collect(CollectKind::Major);

        let geo = self.geometry();
        let heap = &self.heap;

        let mut body = Vec::new();
        write_u32(&mut body, geo.stack_bytes)?;
        write_u32(&mut body, geo.ephemeral_bytes)?;
        write_u32(&mut body, geo.static_bytes)?;
        write_u32(&mut body, geo.tenured_bytes)?;
        write_u32(&mut body, geo.watermark_bytes)?;
        write_u32(&mut body, geo.e_active_low as u32)?;
        write_u32(&mut body, geo.t_active_low as u32)?;

        write_u32(&mut body, ROOT_COUNT as u32)?;
        for &root in heap.roots.as_slice() {
            write_u32(&mut body, root.raw())?;
        }

        let static_words = heap.static_area.words() as u32;
        write_u32(&mut body, static_words)?;
        for i in heap.static_area.base..heap.static_area.limit {
            write_u32(&mut body, heap.arena[i].raw())?;
        }

        let tenured_live = heap.t_active.live_words() as u32;
        write_u32(&mut body, tenured_live)?;
        for i in heap.t_active.base..heap.t_active.top {
            write_u32(&mut body, heap.arena[i].raw())?;
        }

        let mut hasher = Hasher::new();
        hasher.update(&body);
        let checksum = hasher.finalize();

        write_u32(out, IMAGE_MAGIC)?;
        write_u32(out, IMAGE_VERSION)?;
        write_u32(out, body.len() as u32)?;
        out.write_all(&body)?;
        write_u32(out, checksum)?;
        out.flush()?;
        Ok(())
    }

    /// Load a heap image, replacing the heap's entire contents.
    ///
    /// The heap must have been initialized with the same region sizes the
    /// image was written under; otherwise the image's pointer offsets
    /// would dangle and loading fails with `GeometryMismatch`. On success
    /// the ephemeral generation and the transaction list are empty and
    /// all bounds are republished.
    pub fn load_image<R: Read>(&mut self, input: &mut R) -> Result<(), ImageError> {
        let magic = read_u32(input)?;
        if magic != IMAGE_MAGIC {
            return Err(ImageError::InvalidMagic { found: magic });
        }
        let version = read_u32(input)?;
        if version != IMAGE_VERSION {
            return Err(ImageError::IncompatibleVersion { found: version });
        }

        let body_len = read_u32(input)? as usize;
        let mut body = vec![0u8; body_len];
        input.read_exact(&mut body)?;
        let expected = read_u32(input)?;

        let mut hasher = Hasher::new();
        hasher.update(&body);
        let found = hasher.finalize();
        if found != expected {
            return Err(ImageError::ChecksumMismatch { expected, found });
        }

        let mut body = std::io::Cursor::new(body);
        let stored = Geometry {
            stack_bytes: read_u32(&mut body)?,
            ephemeral_bytes: read_u32(&mut body)?,
            static_bytes: read_u32(&mut body)?,
            tenured_bytes: read_u32(&mut body)?,
            watermark_bytes: read_u32(&mut body)?,
            e_active_low: read_u32(&mut body)? != 0,
            t_active_low: read_u32(&mut body)? != 0,
        };

        // Align the active semispace selection with the image before
        // comparing geometries; sizes must match exactly.
        let heap = &mut self.heap;
        if (heap.e_active.base < heap.e_inactive.base) != stored.e_active_low {
            std::mem::swap(&mut heap.e_active, &mut heap.e_inactive);
        }
        if (heap.t_active.base < heap.t_inactive.base) != stored.t_active_low {
            std::mem::swap(&mut heap.t_active, &mut heap.t_inactive);
        }
        if self.geometry() != stored {
            return Err(ImageError::GeometryMismatch);
        }

        let heap = &mut self.heap;
        let root_count = read_u32(&mut body)? as usize;
        if root_count != ROOT_COUNT {
            return Err(ImageError::GeometryMismatch);
        }
        for root in heap.roots.as_mut_slice() {
            *root = Word::from_raw(read_u32(&mut body)?);
        }

        let static_words = read_u32(&mut body)? as usize;
        if static_words != heap.static_area.words() {
            return Err(ImageError::GeometryMismatch);
        }
        for i in heap.static_area.base..heap.static_area.limit {
            heap.arena[i] = Word::from_raw(read_u32(&mut body)?);
        }

        let tenured_live = read_u32(&mut body)? as usize;
        if tenured_live > heap.t_active.limit - heap.t_active.base {
            return Err(ImageError::GeometryMismatch);
        }
        heap.t_active.top = heap.t_active.base + tenured_live;
        for i in heap.t_active.base..heap.t_active.top {
            heap.arena[i] = Word::from_raw(read_u32(&mut body)?);
        }

        // A loaded heap starts with an empty ephemeral generation and an
        // empty transaction list.
        heap.e_active.reset();
        heap.e_inactive.reset();
        heap.t_inactive.reset();
        heap.trans = heap.t_active.limit - 1;
        heap.publish();

        self.force_major = false;
        self.live_after_last = self.heap.words_used();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapConfig;

    fn small_config() -> HeapConfig {
        HeapConfig {
            static_bytes: 256,
            tenured_bytes: 4096,
            ephemeral_bytes: 4096,
            watermark_bytes: 2048,
            stack_bytes: 256,
        }
    }

    fn build_list(gc: &mut Collector, values: &[i32]) {
        let mut list = Word::NIL;
        for &n in values.iter().rev() {
            list = gc.heap_mut().alloc_pair(Word::fixnum(n), list).unwrap();
        }
        gc.heap_mut().set_root(0, list);
    }

    fn read_list(gc: &Collector) -> Vec<i32> {
        let heap = gc.heap();
        let mut out = Vec::new();
        let mut w = heap.root(0);
        while w != Word::NIL {
            out.push(heap.car(w).as_fixnum());
            w = heap.cdr(w);
        }
        out
    }

    #[test]
    fn test_image_round_trip() {
        let mut gc = Collector::new(small_config()).unwrap();
        build_list(&mut gc, &[1, 2, 3, 4, 5]);
        let bv = gc.heap_mut().alloc_bytevector(b"hello").unwrap();
        gc.heap_mut().set_root(1, bv);

        let mut image = Vec::new();
        gc.dump_image(&mut image).unwrap();

        let mut fresh = Collector::new(small_config()).unwrap();
        fresh.load_image(&mut image.as_slice()).unwrap();

        assert_eq!(read_list(&fresh), vec![1, 2, 3, 4, 5]);
        let bv = fresh.heap().root(1);
        assert_eq!(fresh.heap().bytevector_length(bv), 5);
        for (i, &b) in b"hello".iter().enumerate() {
            assert_eq!(fresh.heap().bytevector_ref(bv, i), b);
        }

        // The loaded heap is ready for mutation and collection.
        assert_eq!(fresh.heap().transaction_count(), 0);
        assert_eq!(fresh.heap().e_active.live_words(), 0);
        fresh.collect(CollectKind::Minor);
        assert_eq!(read_list(&fresh), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_dump_collects_first() {
        let mut gc = Collector::new(small_config()).unwrap();
        build_list(&mut gc, &[7]);
        // Garbage that must not reach the image.
        for _ in 0..50 {
            gc.heap_mut().alloc_pair(Word::NIL, Word::NIL).unwrap();
        }

        let mut image = Vec::new();
        gc.dump_image(&mut image).unwrap();
        assert_eq!(gc.stats().major_collections, 1);

        let mut fresh = Collector::new(small_config()).unwrap();
        fresh.load_image(&mut image.as_slice()).unwrap();
        // Only the rooted pair survived into the image.
        assert_eq!(fresh.heap().t_active.live_words(), 2);
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let mut gc = Collector::new(small_config()).unwrap();
        let mut image = Vec::new();
        gc.dump_image(&mut image).unwrap();
        image[0] ^= 0xFF;

        let mut fresh = Collector::new(small_config()).unwrap();
        match fresh.load_image(&mut image.as_slice()) {
            Err(ImageError::InvalidMagic { .. }) => {}
            other => panic!("expected InvalidMagic, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_wrong_version() {
        let mut gc = Collector::new(small_config()).unwrap();
        let mut image = Vec::new();
        gc.dump_image(&mut image).unwrap();
        image[4..8].copy_from_slice(&99u32.to_le_bytes());

        let mut fresh = Collector::new(small_config()).unwrap();
        match fresh.load_image(&mut image.as_slice()) {
            Err(ImageError::IncompatibleVersion { found: 99 }) => {}
            other => panic!("expected IncompatibleVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_corrupt_body() {
        let mut gc = Collector::new(small_config()).unwrap();
        build_list(&mut gc, &[1, 2, 3]);
        let mut image = Vec::new();
        gc.dump_image(&mut image).unwrap();
        // Flip a byte in the middle of the body.
        let mid = image.len() / 2;
        image[mid] ^= 0x01;

        let mut fresh = Collector::new(small_config()).unwrap();
        match fresh.load_image(&mut image.as_slice()) {
            Err(ImageError::ChecksumMismatch { .. }) => {}
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_different_geometry() {
        let mut gc = Collector::new(small_config()).unwrap();
        let mut image = Vec::new();
        gc.dump_image(&mut image).unwrap();

        let mut bigger = Collector::new(HeapConfig {
            tenured_bytes: 8192,
            ..small_config()
        })
        .unwrap();
        match bigger.load_image(&mut image.as_slice()) {
            Err(ImageError::GeometryMismatch) => {}
            other => panic!("expected GeometryMismatch, got {:?}", other),
        }
    }
}
