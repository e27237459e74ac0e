//! # Buffer Segments
//!
//! A segment is one contiguous block of a [`SegmentedBuffer`](crate::SegmentedBuffer):
//! a fixed-capacity byte array plus a valid-length marker.
//!
//! Segment memory can be recycled through a [`SegmentPool`], which several
//! buffers (possibly on different threads) may share. Clearing or disposing a
//! pooled buffer hands its blocks back instead of freeing them.

use parking_lot::Mutex;

/// One contiguous block of buffer storage.
///
/// `capacity()` may exceed `len()`; only the first `len()` bytes are data.
#[derive(Debug)]
pub struct Segment {
    /// Backing storage. Its length is the segment capacity.
    data: Vec<u8>,
    /// Number of valid bytes at the start of `data`.
    len: usize,
}

impl Segment {
    /// Creates an empty segment with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity],
            len: 0,
        }
    }

    /// Wraps a recycled block, discarding its previous contents.
    fn from_block(data: Vec<u8>) -> Self {
        Self { data, len: 0 }
    }

    /// Total bytes this segment can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the segment holds no data.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes still free at the end of the segment.
    #[inline]
    #[must_use]
    pub fn spare_capacity(&self) -> usize {
        self.data.len() - self.len
    }

    /// The valid bytes.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The free region after the valid bytes.
    #[inline]
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Marks `count` more bytes of the free region as valid.
    #[inline]
    pub(crate) fn commit(&mut self, count: usize) {
        debug_assert!(count <= self.spare_capacity());
        self.len += count;
    }

    /// Forgets the contents, keeping the allocation.
    #[inline]
    pub(crate) fn reset(&mut self) {
        self.len = 0;
    }

    /// Releases the backing block.
    fn into_block(self) -> Vec<u8> {
        self.data
    }
}

/// Thread-safe free list of segment blocks.
///
/// # Example
///
/// ```rust,ignore
/// let pool = Arc::new(SegmentPool::new(64));
/// let mut buffer = SegmentedBuffer::with_pool(Arc::clone(&pool), 4096);
/// // ... write, read ...
/// buffer.dispose(); // blocks go back to `pool`
/// ```
#[derive(Debug)]
pub struct SegmentPool {
    /// Recycled blocks, most recently returned last.
    free: Mutex<Vec<Vec<u8>>>,
    /// Upper bound on retained blocks; extra returns are dropped.
    max_pooled: usize,
}

impl SegmentPool {
    /// Creates a pool retaining at most `max_pooled` blocks.
    #[must_use]
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_pooled)),
            max_pooled,
        }
    }

    /// Number of blocks currently available for reuse.
    #[must_use]
    pub fn pooled_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Takes a segment with at least `min_capacity` bytes, reusing a pooled
    /// block when one is large enough.
    #[must_use]
    pub fn take(&self, min_capacity: usize) -> Segment {
        let mut free = self.free.lock();
        match free.iter().rposition(|block| block.len() >= min_capacity) {
            Some(index) => Segment::from_block(free.swap_remove(index)),
            None => {
                drop(free);
                Segment::with_capacity(min_capacity)
            }
        }
    }

    /// Returns a segment's block to the pool.
    pub fn give(&self, segment: Segment) {
        let mut free = self.free.lock();
        if free.len() < self.max_pooled && segment.capacity() > 0 {
            free.push(segment.into_block());
        }
    }
}

impl Default for SegmentPool {
    fn default() -> Self {
        Self::new(32)
    }
}
