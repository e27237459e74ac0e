//! # Binary Writer
//!
//! Typed encoders producing the wire format.
//!
//! ## Two Call Conventions
//!
//! ```text
//! Checked:   writer.write_u32(7);              // reserves, then writes
//!
//! Reserved:  let mut span = writer.reserve(9); // one contiguous reservation
//!            span.put_u32(7);
//!            span.put_var_uint(300);
//! ```
//!
//! Every checked `write_*` is `reserve(max_len).put_*()`, so both conventions
//! share one encoder and produce identical bytes.
//!
//! ## Wire Summary
//!
//! | Value            | Encoding                                        |
//! |------------------|-------------------------------------------------|
//! | fixed ints       | big-endian                                      |
//! | 128-bit ints     | high u64 then low u64, big-endian               |
//! | floats           | IEEE-754 bits through the fixed int path        |
//! | var ints         | LEB128, zig-zag for signed                      |
//! | string / bytes   | signed var-int length (`-1` = null) + payload   |
//! | GUID             | `0x20` marker + 16 bytes (`0x01` = null)        |

use crate::buffer::SegmentedBuffer;
use crate::cursor::{LowLevelWriter, Reservation};
use crate::types::{Fixed32, Fixed64, Guid};
use crate::varint::{self, MAX_VAR_U128_BYTES, MAX_VAR_U32_BYTES, MAX_VAR_U64_BYTES};

/// Marker byte preceding a 16-byte GUID (zig-zag var-int of 16).
pub const GUID_MARKER: u8 = 0x20;

/// Marker byte for a null GUID (zig-zag var-int of -1).
pub const NULL_MARKER: u8 = 0x01;

/// Payloads shorter than this use a one-byte length prefix.
pub const SHORT_STRING_LIMIT: usize = 64;

/// Contiguous pre-reserved space with unchecked `put_*` encoders.
///
/// Writing more than was reserved panics.
pub struct ReservedSpan<'w> {
    inner: Reservation<'w>,
}

impl ReservedSpan<'_> {
    /// Bytes still free.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    /// Puts one unsigned byte.
    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.inner.put_byte(value);
    }

    /// Puts one signed byte.
    #[inline]
    pub fn put_i8(&mut self, value: i8) {
        self.inner.put_slice(&value.to_be_bytes());
    }

    /// Puts a boolean as `0` or `1`.
    #[inline]
    pub fn put_bool(&mut self, value: bool) {
        self.inner.put_byte(u8::from(value));
    }

    /// Puts a big-endian `u16`.
    #[inline]
    pub fn put_u16(&mut self, value: u16) {
        self.inner.put_slice(&value.to_be_bytes());
    }

    /// Puts a big-endian `i16`.
    #[inline]
    pub fn put_i16(&mut self, value: i16) {
        self.inner.put_slice(&value.to_be_bytes());
    }

    /// Puts a big-endian `u32`.
    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.inner.put_slice(&value.to_be_bytes());
    }

    /// Puts a big-endian `i32`.
    #[inline]
    pub fn put_i32(&mut self, value: i32) {
        self.inner.put_slice(&value.to_be_bytes());
    }

    /// Puts a big-endian `u64`.
    #[inline]
    pub fn put_u64(&mut self, value: u64) {
        self.inner.put_slice(&value.to_be_bytes());
    }

    /// Puts a big-endian `i64`.
    #[inline]
    pub fn put_i64(&mut self, value: i64) {
        self.inner.put_slice(&value.to_be_bytes());
    }

    /// Puts a `u128` as high then low big-endian halves.
    #[inline]
    pub fn put_u128(&mut self, value: u128) {
        self.put_u64((value >> 64) as u64);
        self.put_u64(value as u64);
    }

    /// Puts an `i128` as high then low big-endian halves.
    #[inline]
    pub fn put_i128(&mut self, value: i128) {
        self.put_u128(value as u128);
    }

    /// Puts the IEEE-754 bits of an `f32`.
    #[inline]
    pub fn put_f32(&mut self, value: f32) {
        self.put_u32(value.to_bits());
    }

    /// Puts the IEEE-754 bits of an `f64`.
    #[inline]
    pub fn put_f64(&mut self, value: f64) {
        self.put_u64(value.to_bits());
    }

    /// Puts the raw value of a Q16.16 number.
    #[inline]
    pub fn put_fixed32(&mut self, value: Fixed32) {
        self.put_i32(value.raw());
    }

    /// Puts the raw value of a Q32.32 number.
    #[inline]
    pub fn put_fixed64(&mut self, value: Fixed64) {
        self.put_i64(value.raw());
    }

    /// Puts an unsigned 32-bit var-int (1..=5 bytes).
    #[inline]
    pub fn put_var_uint(&mut self, value: u32) {
        self.put_var_ulong(u64::from(value));
    }

    /// Puts a zig-zag signed 32-bit var-int.
    #[inline]
    pub fn put_var_int(&mut self, value: i32) {
        self.put_var_uint(varint::zigzag_encode_32(value));
    }

    /// Puts an unsigned 64-bit var-int (1..=10 bytes).
    #[inline]
    pub fn put_var_ulong(&mut self, value: u64) {
        let count = varint::encode_u64(value, self.inner.unused_mut());
        self.inner.advance(count);
    }

    /// Puts a zig-zag signed 64-bit var-int.
    #[inline]
    pub fn put_var_long(&mut self, value: i64) {
        self.put_var_ulong(varint::zigzag_encode_64(value));
    }

    /// Puts an unsigned 128-bit var-int (1..=19 bytes).
    #[inline]
    pub fn put_var_u128(&mut self, value: u128) {
        let count = varint::encode_u128(value, self.inner.unused_mut());
        self.inner.advance(count);
    }

    /// Puts a zig-zag signed 128-bit var-int.
    #[inline]
    pub fn put_var_i128(&mut self, value: i128) {
        self.put_var_u128(varint::zigzag_encode_128(value));
    }

    /// Puts a GUID with its marker byte.
    #[inline]
    pub fn put_guid(&mut self, value: &Guid) {
        self.inner.put_byte(GUID_MARKER);
        self.inner.put_slice(value.as_bytes());
    }

    /// Puts a GUID or the null marker.
    #[inline]
    pub fn put_nullable_guid(&mut self, value: Option<&Guid>) {
        match value {
            Some(guid) => self.put_guid(guid),
            None => self.inner.put_byte(NULL_MARKER),
        }
    }

    /// Puts raw bytes.
    #[inline]
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.inner.put_slice(bytes);
    }
}

/// Typed writer appending to a [`SegmentedBuffer`].
///
/// Holds the buffer's write lock until dropped or [`finish`](Self::finish)ed.
pub struct IOWriter<'a> {
    inner: LowLevelWriter<'a>,
}

impl<'a> IOWriter<'a> {
    /// Starts appending to `buffer`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is already locked.
    pub fn new(buffer: &'a mut SegmentedBuffer) -> Self {
        Self {
            inner: LowLevelWriter::new(buffer),
        }
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub const fn bytes_written(&self) -> usize {
        self.inner.bytes_written()
    }

    /// Reserves `count` contiguous bytes for unchecked `put_*` calls.
    ///
    /// A reservation that does not fit the current segment abandons its
    /// tail; see [`LowLevelWriter::reserve`].
    #[inline]
    pub fn reserve(&mut self, count: usize) -> ReservedSpan<'_> {
        ReservedSpan {
            inner: self.inner.reserve(count),
        }
    }

    /// Commits everything and releases the buffer. Returns bytes written.
    pub fn finish(self) -> usize {
        self.inner.finish()
    }

    // =========================================================================
    // Fixed width
    // =========================================================================

    /// Writes one unsigned byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.reserve(1).put_u8(value);
    }

    /// Writes one signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) {
        self.reserve(1).put_i8(value);
    }

    /// Writes a boolean.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.reserve(1).put_bool(value);
    }

    /// Writes a big-endian `u16`.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.reserve(2).put_u16(value);
    }

    /// Writes a big-endian `i16`.
    #[inline]
    pub fn write_i16(&mut self, value: i16) {
        self.reserve(2).put_i16(value);
    }

    /// Writes a big-endian `u32`.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.reserve(4).put_u32(value);
    }

    /// Writes a big-endian `i32`.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.reserve(4).put_i32(value);
    }

    /// Writes a big-endian `u64`.
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.reserve(8).put_u64(value);
    }

    /// Writes a big-endian `i64`.
    #[inline]
    pub fn write_i64(&mut self, value: i64) {
        self.reserve(8).put_i64(value);
    }

    /// Writes a `u128` as two big-endian halves, high first.
    #[inline]
    pub fn write_u128(&mut self, value: u128) {
        self.reserve(16).put_u128(value);
    }

    /// Writes an `i128` as two big-endian halves, high first.
    #[inline]
    pub fn write_i128(&mut self, value: i128) {
        self.reserve(16).put_i128(value);
    }

    /// Writes an `f32` bit pattern.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.reserve(4).put_f32(value);
    }

    /// Writes an `f64` bit pattern.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.reserve(8).put_f64(value);
    }

    /// Writes a Q16.16 value.
    #[inline]
    pub fn write_fixed32(&mut self, value: Fixed32) {
        self.reserve(4).put_fixed32(value);
    }

    /// Writes a Q32.32 value.
    #[inline]
    pub fn write_fixed64(&mut self, value: Fixed64) {
        self.reserve(8).put_fixed64(value);
    }

    // =========================================================================
    // Variable length
    // =========================================================================

    /// Writes an unsigned 32-bit var-int.
    #[inline]
    pub fn write_var_uint(&mut self, value: u32) {
        self.reserve(MAX_VAR_U32_BYTES).put_var_uint(value);
    }

    /// Writes a zig-zag signed 32-bit var-int.
    #[inline]
    pub fn write_var_int(&mut self, value: i32) {
        self.reserve(MAX_VAR_U32_BYTES).put_var_int(value);
    }

    /// Writes an unsigned 64-bit var-int.
    #[inline]
    pub fn write_var_ulong(&mut self, value: u64) {
        self.reserve(MAX_VAR_U64_BYTES).put_var_ulong(value);
    }

    /// Writes a zig-zag signed 64-bit var-int.
    #[inline]
    pub fn write_var_long(&mut self, value: i64) {
        self.reserve(MAX_VAR_U64_BYTES).put_var_long(value);
    }

    /// Writes an unsigned 128-bit var-int.
    #[inline]
    pub fn write_var_u128(&mut self, value: u128) {
        self.reserve(MAX_VAR_U128_BYTES).put_var_u128(value);
    }

    /// Writes a zig-zag signed 128-bit var-int.
    #[inline]
    pub fn write_var_i128(&mut self, value: i128) {
        self.reserve(MAX_VAR_U128_BYTES).put_var_i128(value);
    }

    /// Writes a collection length as an unsigned var-int.
    ///
    /// # Panics
    ///
    /// Panics if `len` does not fit in a `u32`.
    pub fn write_var_len(&mut self, len: usize) {
        let Ok(len) = u32::try_from(len) else {
            panic!("collection length {len} exceeds u32");
        };
        self.write_var_uint(len);
    }

    // =========================================================================
    // Strings, byte strings, GUIDs
    // =========================================================================

    /// Writes a UTF-8 string, or the null sentinel for `None`.
    ///
    /// # Panics
    ///
    /// Panics if the string is longer than `i32::MAX` bytes.
    pub fn write_string(&mut self, value: Option<&str>) {
        match value {
            Some(text) => self.write_str(text),
            None => self.write_var_int(-1),
        }
    }

    /// Writes a non-null UTF-8 string.
    ///
    /// # Panics
    ///
    /// Panics if the string is longer than `i32::MAX` bytes.
    pub fn write_str(&mut self, value: &str) {
        self.write_length_prefixed(value.as_bytes());
    }

    /// Writes a byte string, or the null sentinel for `None`.
    ///
    /// # Panics
    ///
    /// Panics if the payload is longer than `i32::MAX` bytes.
    pub fn write_byte_string(&mut self, value: Option<&[u8]>) {
        match value {
            Some(bytes) => self.write_length_prefixed(bytes),
            None => self.write_var_int(-1),
        }
    }

    /// Writes a GUID with its marker byte.
    #[inline]
    pub fn write_guid(&mut self, value: &Guid) {
        self.reserve(17).put_guid(value);
    }

    /// Writes a GUID or the null marker.
    #[inline]
    pub fn write_nullable_guid(&mut self, value: Option<&Guid>) {
        self.reserve(17).put_nullable_guid(value);
    }

    /// Writes raw bytes with no framing, spilling across segments as needed.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.inner.write_all(bytes);
    }

    fn write_length_prefixed(&mut self, payload: &[u8]) {
        let len = payload.len();
        if len < SHORT_STRING_LIMIT {
            // Zig-zag of len < 64 is a single byte: len << 1.
            let mut span = self.reserve(1 + len);
            span.put_u8((len as u8) << 1);
            span.put_raw(payload);
            return;
        }
        let Ok(prefix) = i32::try_from(len) else {
            panic!("payload length {len} exceeds i32");
        };
        self.write_var_int(prefix);
        self.write_raw(payload);
    }
}

/// Encodes into a fresh buffer and returns the bytes as one vector.
///
/// # Example
///
/// ```rust,ignore
/// let bytes = encode_to_vec(|w| w.write_var_uint(300));
/// assert_eq!(bytes, [0xAC, 0x02]);
/// ```
pub fn encode_to_vec<F>(encode: F) -> Vec<u8>
where
    F: FnOnce(&mut IOWriter<'_>),
{
    let mut buffer = SegmentedBuffer::new();
    {
        let mut writer = IOWriter::new(&mut buffer);
        encode(&mut writer);
        writer.finish();
    }
    buffer.to_vec()
}
