//! # Low-Level Reader / Writer
//!
//! Byte-level cursors over a [`SegmentedBuffer`] (or a flat slice for reads).
//! Segment boundaries are crossed transparently: the segment layout of a
//! buffer is never observable through these types.
//!
//! ```text
//!   segment 0        segment 1     segment 2
//! ┌───────────┐   ┌──────────┐   ┌─────────┐
//! │ a b c d e │ → │ f g      │ → │ h i j k │
//! └───────────┘   └──────────┘   └─────────┘
//!               ▲
//!   offset_before_segment = 5, segment_offset = 1 → total_offset = 6
//! ```

use crate::buffer::{ReadScope, SegmentedBuffer};
use crate::error::{DecodeError, DecodeResult};

/// Position of a reader cursor.
///
/// Invariant: `total_offset() <= input length`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorPosition {
    /// Index of the current segment.
    pub segment_index: usize,
    /// Offset inside the current segment.
    pub segment_offset: usize,
    /// Sum of the lengths of all earlier segments.
    pub offset_before_segment: usize,
}

impl CursorPosition {
    /// Absolute offset from the start of the input.
    #[inline]
    #[must_use]
    pub const fn total_offset(&self) -> usize {
        self.offset_before_segment + self.segment_offset
    }
}

/// Where a reader's bytes come from.
enum Source<'a> {
    /// A single contiguous slice.
    Flat(&'a [u8]),
    /// A segmented buffer, read-locked for the reader's lifetime.
    Segmented(ReadScope<'a>),
}

/// Sequential byte reader.
///
/// Not thread-safe; one traversal per reader.
pub struct LowLevelReader<'a> {
    source: Source<'a>,
    cursor: CursorPosition,
    total_len: usize,
}

impl<'a> LowLevelReader<'a> {
    /// Reads from a flat slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            source: Source::Flat(data),
            cursor: CursorPosition::default(),
            total_len: data.len(),
        }
    }

    /// Reads from a segmented buffer, holding read access until dropped.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is write-locked.
    #[must_use]
    pub fn from_buffer(buffer: &'a SegmentedBuffer) -> Self {
        let scope = buffer.read_scope();
        let mut reader = Self {
            source: Source::Segmented(scope),
            cursor: CursorPosition::default(),
            total_len: buffer.len(),
        };
        reader.normalize();
        reader
    }

    /// Total input length.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.total_len
    }

    /// Returns true if the input is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    /// Absolute read offset.
    #[inline]
    #[must_use]
    pub const fn total_offset(&self) -> usize {
        self.cursor.total_offset()
    }

    /// Bytes left to read.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total_len - self.cursor.total_offset()
    }

    /// Current cursor position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> CursorPosition {
        self.cursor
    }

    /// Restores a position previously returned by [`position`](Self::position).
    #[inline]
    pub(crate) fn restore(&mut self, position: CursorPosition) {
        self.cursor = position;
    }

    /// Unread bytes of the current segment.
    #[inline]
    #[must_use]
    pub fn contiguous(&self) -> &'a [u8] {
        if self.cursor.segment_index >= self.segment_count() {
            return &[];
        }
        &self.segment(self.cursor.segment_index)[self.cursor.segment_offset..]
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] at end of input.
    pub fn read_byte(&mut self) -> DecodeResult<u8> {
        let Some(&byte) = self.contiguous().first() else {
            return Err(DecodeError::UnexpectedEnd {
                needed: 1,
                remaining: 0,
            });
        };
        self.cursor.segment_offset += 1;
        self.normalize();
        Ok(byte)
    }

    /// Fills `dst` exactly. On failure nothing is consumed.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if fewer than `dst.len()` bytes remain.
    pub fn read_all(&mut self, dst: &mut [u8]) -> DecodeResult<()> {
        self.check_remaining(dst.len())?;
        let mut filled = 0;
        while filled < dst.len() {
            let chunk = self.contiguous();
            let count = chunk.len().min(dst.len() - filled);
            dst[filled..filled + count].copy_from_slice(&chunk[..count]);
            filled += count;
            self.cursor.segment_offset += count;
            self.normalize();
        }
        Ok(())
    }

    /// Reads as many bytes as are available, up to `dst.len()`.
    ///
    /// Returns the number of bytes read.
    pub fn read_some(&mut self, dst: &mut [u8]) -> usize {
        let count = dst.len().min(self.remaining());
        // Cannot fail: count <= remaining.
        let _ = self.read_all(&mut dst[..count]);
        count
    }

    /// Skips `count` bytes. On failure nothing is consumed.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if fewer than `count` bytes remain.
    pub fn skip_bytes(&mut self, count: usize) -> DecodeResult<()> {
        self.check_remaining(count)?;
        let mut left = count;
        while left > 0 {
            let step = self.contiguous().len().min(left);
            self.cursor.segment_offset += step;
            left -= step;
            self.normalize();
        }
        Ok(())
    }

    /// Moves the cursor to an absolute offset.
    ///
    /// # Errors
    ///
    /// [`DecodeError::SeekOutOfRange`] if `offset` is past the end.
    pub fn seek(&mut self, offset: usize) -> DecodeResult<()> {
        if offset > self.total_len {
            return Err(DecodeError::SeekOutOfRange {
                offset,
                len: self.total_len,
            });
        }
        self.cursor = CursorPosition::default();
        self.normalize();
        self.skip_bytes(offset)
    }

    fn check_remaining(&self, needed: usize) -> DecodeResult<()> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::UnexpectedEnd { needed, remaining });
        }
        Ok(())
    }

    fn segment_count(&self) -> usize {
        match &self.source {
            Source::Flat(_) => 1,
            Source::Segmented(scope) => scope.buffer().segment_count(),
        }
    }

    fn segment(&self, index: usize) -> &'a [u8] {
        match &self.source {
            Source::Flat(data) => *data,
            Source::Segmented(scope) => scope.buffer().segment(index),
        }
    }

    /// Steps past exhausted (or empty) segments while later ones exist.
    fn normalize(&mut self) {
        let count = self.segment_count();
        while self.cursor.segment_index + 1 < count {
            let len = self.segment(self.cursor.segment_index).len();
            if self.cursor.segment_offset < len {
                break;
            }
            self.cursor.offset_before_segment += len;
            self.cursor.segment_index += 1;
            self.cursor.segment_offset = 0;
        }
    }
}

/// Sequential byte writer appending to a [`SegmentedBuffer`].
///
/// Holds the buffer's write lock from construction until dropped; bytes are
/// committed to the buffer on drop (or [`finish`](Self::finish)).
pub struct LowLevelWriter<'a> {
    buffer: &'a mut SegmentedBuffer,
    /// Length of the current uncommitted view (0 = none).
    span_len: usize,
    /// Bytes written into the current view.
    written: usize,
    /// Bytes written by this writer in total.
    total_written: usize,
}

impl<'a> LowLevelWriter<'a> {
    /// Starts appending to `buffer`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is already locked.
    pub fn new(buffer: &'a mut SegmentedBuffer) -> Self {
        buffer.begin_write();
        Self {
            buffer,
            span_len: 0,
            written: 0,
            total_written: 0,
        }
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub const fn bytes_written(&self) -> usize {
        self.total_written
    }

    /// Returns a writable span of at least `min_bytes`. Follow with
    /// [`advance`](Self::advance).
    pub fn get_span(&mut self, min_bytes: usize) -> &mut [u8] {
        self.ensure_span(min_bytes);
        let start = self.written;
        &mut self.buffer.pending_memory_mut()[start..]
    }

    /// Marks `count` bytes of the last span as written.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the span.
    pub fn advance(&mut self, count: usize) {
        assert!(
            count <= self.span_len - self.written,
            "advance({count}) past end of span"
        );
        self.written += count;
        self.total_written += count;
    }

    /// Reserves exactly `count` contiguous bytes.
    ///
    /// If the current segment has fewer than `count` bytes left, the rest of
    /// it stays unused and the reservation starts a new segment of
    /// `max(count, segment_size)` bytes. Reservations close to the segment
    /// size can leave most of each segment empty.
    pub fn reserve(&mut self, count: usize) -> Reservation<'_> {
        self.ensure_span(count);
        let start = self.written;
        let view = &mut self.buffer.pending_memory_mut()[start..start + count];
        Reservation {
            view,
            used: 0,
            written: &mut self.written,
            total_written: &mut self.total_written,
        }
    }

    /// Appends `bytes`, spilling across segments as needed.
    pub fn write_all(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while !rest.is_empty() {
            let span = self.get_span(1);
            let count = span.len().min(rest.len());
            span[..count].copy_from_slice(&rest[..count]);
            self.advance(count);
            rest = &rest[count..];
        }
    }

    /// Commits everything and releases the buffer. Returns bytes written.
    pub fn finish(mut self) -> usize {
        self.commit_span();
        self.total_written
    }

    fn ensure_span(&mut self, min_bytes: usize) {
        if self.span_len - self.written < min_bytes || self.span_len == 0 {
            self.commit_span();
            self.span_len = self.buffer.get_memory(min_bytes).len();
        }
    }

    fn commit_span(&mut self) {
        if self.span_len > 0 {
            self.buffer.commit_memory(self.written);
            self.span_len = 0;
            self.written = 0;
        }
    }
}

impl Drop for LowLevelWriter<'_> {
    fn drop(&mut self) {
        self.commit_span();
        self.buffer.end_write();
    }
}

/// Contiguous space pre-reserved by [`LowLevelWriter::reserve`].
///
/// Bytes put into the reservation are committed to the writer on drop.
/// Putting more than was reserved panics (slice bounds), never corrupts.
pub struct Reservation<'w> {
    view: &'w mut [u8],
    used: usize,
    written: &'w mut usize,
    total_written: &'w mut usize,
}

impl Reservation<'_> {
    /// Bytes still unused in the reservation.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.view.len() - self.used
    }

    /// Puts one byte.
    #[inline]
    pub fn put_byte(&mut self, byte: u8) {
        self.view[self.used] = byte;
        self.used += 1;
    }

    /// Puts a run of bytes.
    #[inline]
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.view[self.used..self.used + bytes.len()].copy_from_slice(bytes);
        self.used += bytes.len();
    }

    /// The unused part, for encoders that report their own length.
    #[inline]
    pub fn unused_mut(&mut self) -> &mut [u8] {
        &mut self.view[self.used..]
    }

    /// Marks `count` bytes of [`unused_mut`](Self::unused_mut) as used.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        assert!(count <= self.remaining(), "advance past reservation");
        self.used += count;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        *self.written += self.used;
        *self.total_written += self.used;
    }
}
