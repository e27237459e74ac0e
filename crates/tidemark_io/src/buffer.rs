//! # Segmented Buffer
//!
//! Append-only byte store split into growable segments.
//!
//! ## Lock Discipline
//!
//! ```text
//!              begin_write()              begin_read()
//!   Writing <─────────────── Unlocked ───────────────> Reading(n)
//!      │        end_write()     ▲     end_read() (n=1)     │
//!      └────────────────────────┘──────────────────────────┘
//! ```
//!
//! - One writer OR any number of readers, never both.
//! - `clear()` is only valid while unlocked.
//! - Violations are programmer errors and panic.
//!
//! This is a cooperative protocol enforced by the type, not an OS lock. The
//! buffer is `!Sync`; share it across threads only by moving it.
//!
//! ## Write-Allocate Protocol
//!
//! ```rust,ignore
//! buffer.begin_write();
//! let view = buffer.get_memory(16);   // at least 16 bytes
//! view[..5].copy_from_slice(b"hello");
//! buffer.commit_memory(5);            // declare what was used (<= view.len())
//! buffer.end_write();
//! ```

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::segment::{Segment, SegmentPool};

/// Default capacity of freshly allocated segments.
pub const DEFAULT_SEGMENT_SIZE: usize = 4096;

/// Access state of a [`SegmentedBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    /// No access in progress.
    Unlocked,
    /// A single writer holds exclusive access.
    Writing,
    /// The given number of readers hold shared access.
    Reading(usize),
}

/// Append-only byte store made of one or more segments.
///
/// At least one segment always exists, possibly empty.
#[derive(Debug)]
pub struct SegmentedBuffer {
    /// Segments in order. Never empty.
    segments: Vec<Segment>,
    /// Current access state.
    lock: Cell<LockState>,
    /// Length of the view handed out by the last `get_memory`, until committed.
    pending: Option<usize>,
    /// Total valid bytes across all segments.
    total_len: usize,
    /// Capacity used for new segments (grown to fit larger requests).
    segment_size: usize,
    /// Optional shared pool for segment memory.
    pool: Option<Arc<SegmentPool>>,
}

impl SegmentedBuffer {
    /// Creates an empty buffer with the default segment size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_segment_size(DEFAULT_SEGMENT_SIZE)
    }

    /// Creates an empty buffer whose new segments hold `segment_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `segment_size` is zero.
    #[must_use]
    pub fn with_segment_size(segment_size: usize) -> Self {
        assert!(segment_size > 0, "Segment size must be greater than zero");
        Self {
            segments: vec![Segment::with_capacity(segment_size)],
            lock: Cell::new(LockState::Unlocked),
            pending: None,
            total_len: 0,
            segment_size,
            pool: None,
        }
    }

    /// Creates an empty buffer drawing segment memory from `pool`.
    ///
    /// # Panics
    ///
    /// Panics if `segment_size` is zero.
    #[must_use]
    pub fn with_pool(pool: Arc<SegmentPool>, segment_size: usize) -> Self {
        assert!(segment_size > 0, "Segment size must be greater than zero");
        let first = pool.take(segment_size);
        Self {
            segments: vec![first],
            lock: Cell::new(LockState::Unlocked),
            pending: None,
            total_len: 0,
            segment_size,
            pool: Some(pool),
        }
    }

    /// Creates a buffer with exactly one segment per chunk.
    ///
    /// Useful for reproducing a specific segment layout.
    #[must_use]
    pub fn from_chunks(chunks: &[&[u8]]) -> Self {
        let mut buffer = Self::with_segment_size(DEFAULT_SEGMENT_SIZE);
        if chunks.is_empty() {
            return buffer;
        }
        buffer.segments.clear();
        for chunk in chunks {
            let mut segment = Segment::with_capacity(chunk.len());
            segment.spare_mut().copy_from_slice(chunk);
            segment.commit(chunk.len());
            buffer.total_len += chunk.len();
            buffer.segments.push(segment);
        }
        buffer
    }

    /// Returns the current access state.
    #[inline]
    #[must_use]
    pub fn lock_state(&self) -> LockState {
        self.lock.get()
    }

    /// Total valid bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.total_len
    }

    /// Returns true if the buffer holds no data.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    /// Number of segments (always at least one).
    #[inline]
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Acquires exclusive write access.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is already write- or read-locked.
    pub fn begin_write(&mut self) {
        let state = self.lock.get();
        assert!(
            state == LockState::Unlocked,
            "begin_write on buffer in state {state:?}"
        );
        self.lock.set(LockState::Writing);
    }

    /// Releases write access.
    ///
    /// # Panics
    ///
    /// Panics if not write-locked, or if memory from `get_memory` was never
    /// committed.
    pub fn end_write(&mut self) {
        self.assert_writing("end_write");
        assert!(
            self.pending.is_none(),
            "end_write with uncommitted memory from get_memory"
        );
        self.lock.set(LockState::Unlocked);
    }

    /// Returns a writable view of at least `min_bytes` bytes at the end of the
    /// buffer. Follow with [`commit_memory`](Self::commit_memory).
    ///
    /// # Panics
    ///
    /// Panics if not write-locked or if a previous view is still uncommitted.
    pub fn get_memory(&mut self, min_bytes: usize) -> &mut [u8] {
        self.assert_writing("get_memory");
        assert!(
            self.pending.is_none(),
            "get_memory called twice without commit_memory"
        );
        let min_bytes = min_bytes.max(1);
        if self.last().spare_capacity() < min_bytes {
            let segment = self.allocate_segment(min_bytes.max(self.segment_size));
            if self.last().is_empty() {
                let replaced = std::mem::replace(self.last_mut(), segment);
                self.release_segment(replaced);
            } else {
                self.segments.push(segment);
            }
        }
        self.pending = Some(self.last().spare_capacity());
        self.last_mut().spare_mut()
    }

    /// The view returned by the last `get_memory`, still uncommitted.
    pub(crate) fn pending_memory_mut(&mut self) -> &mut [u8] {
        assert!(self.pending.is_some(), "no pending memory view");
        self.last_mut().spare_mut()
    }

    /// Declares how many bytes of the last `get_memory` view were written.
    ///
    /// # Panics
    ///
    /// Panics if not write-locked, if no view is outstanding, or if `count`
    /// exceeds the view length.
    pub fn commit_memory(&mut self, count: usize) {
        self.assert_writing("commit_memory");
        let Some(requested) = self.pending.take() else {
            panic!("commit_memory without get_memory");
        };
        assert!(
            count <= requested,
            "commit_memory({count}) exceeds view of {requested} bytes"
        );
        self.last_mut().commit(count);
        self.total_len += count;
    }

    /// Acquires write access for the lifetime of the returned scope.
    pub fn write_scope(&mut self) -> WriteScope<'_> {
        self.begin_write();
        WriteScope { buffer: self }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Acquires shared read access (reference counted).
    ///
    /// # Panics
    ///
    /// Panics if the buffer is write-locked.
    pub fn begin_read(&self) {
        let next = match self.lock.get() {
            LockState::Unlocked => LockState::Reading(1),
            LockState::Reading(count) => LockState::Reading(count + 1),
            LockState::Writing => panic!("begin_read on write-locked buffer"),
        };
        self.lock.set(next);
    }

    /// Releases one read access.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not read-locked.
    pub fn end_read(&self) {
        let next = match self.lock.get() {
            LockState::Reading(1) => LockState::Unlocked,
            LockState::Reading(count) => LockState::Reading(count - 1),
            state => panic!("end_read on buffer in state {state:?}"),
        };
        self.lock.set(next);
    }

    /// Acquires read access for the lifetime of the returned scope.
    pub fn read_scope(&self) -> ReadScope<'_> {
        self.begin_read();
        ReadScope { buffer: self }
    }

    /// Valid bytes of segment `index`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not read-locked or `index` is out of range.
    #[must_use]
    pub fn segment(&self, index: usize) -> &[u8] {
        assert!(
            matches!(self.lock.get(), LockState::Reading(_)),
            "segment access requires read access"
        );
        self.segments[index].as_slice()
    }

    /// Copies the contents into one contiguous vector.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is write-locked.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let _scope = self.read_scope();
        let mut out = Vec::with_capacity(self.total_len);
        for segment in &self.segments {
            out.extend_from_slice(segment.as_slice());
        }
        out
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Resets to logically empty. The first segment's capacity is kept;
    /// other segments are returned to the pool (or freed).
    ///
    /// # Panics
    ///
    /// Panics if any read or write access is active.
    pub fn clear(&mut self) {
        let state = self.lock.get();
        assert!(
            state == LockState::Unlocked,
            "clear on buffer in state {state:?}"
        );
        let extra: Vec<Segment> = self.segments.drain(1..).collect();
        for segment in extra {
            self.release_segment(segment);
        }
        self.segments[0].reset();
        self.total_len = 0;
    }

    /// Releases all segment memory back to the pool.
    pub fn dispose(self) {
        drop(self);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn assert_writing(&self, operation: &str) {
        let state = self.lock.get();
        assert!(
            state == LockState::Writing,
            "{operation} on buffer in state {state:?}"
        );
    }

    fn last(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    fn last_mut(&mut self) -> &mut Segment {
        let index = self.segments.len() - 1;
        &mut self.segments[index]
    }

    fn allocate_segment(&self, capacity: usize) -> Segment {
        match &self.pool {
            Some(pool) => pool.take(capacity),
            None => Segment::with_capacity(capacity),
        }
    }

    fn release_segment(&self, segment: Segment) {
        if let Some(pool) = &self.pool {
            pool.give(segment);
        }
    }
}

impl Default for SegmentedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SegmentedBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            for segment in self.segments.drain(..) {
                pool.give(segment);
            }
        }
    }
}

/// Scoped write access; releases the write lock on drop.
#[derive(Debug)]
pub struct WriteScope<'a> {
    buffer: &'a mut SegmentedBuffer,
}

impl Deref for WriteScope<'_> {
    type Target = SegmentedBuffer;

    fn deref(&self) -> &SegmentedBuffer {
        self.buffer
    }
}

impl DerefMut for WriteScope<'_> {
    fn deref_mut(&mut self) -> &mut SegmentedBuffer {
        self.buffer
    }
}

impl Drop for WriteScope<'_> {
    fn drop(&mut self) {
        // An unwinding writer may leave a view uncommitted; drop it rather
        // than double-panic inside end_write.
        self.buffer.pending = None;
        self.buffer.end_write();
    }
}

/// Scoped read access; releases one read lock on drop.
#[derive(Debug)]
pub struct ReadScope<'a> {
    buffer: &'a SegmentedBuffer,
}

impl<'a> ReadScope<'a> {
    /// The buffer being read.
    #[must_use]
    pub const fn buffer(&self) -> &'a SegmentedBuffer {
        self.buffer
    }
}

impl Drop for ReadScope<'_> {
    fn drop(&mut self) {
        self.buffer.end_read();
    }
}
