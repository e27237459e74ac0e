//! # Binary Reader
//!
//! Typed decoders for the wire format written by [`IOWriter`](crate::IOWriter).
//!
//! Every `read_*` is all-or-nothing: on error the cursor is back where the
//! call started, so a malformed value never disturbs unrelated reads.

use crate::buffer::SegmentedBuffer;
use crate::cursor::LowLevelReader;
use crate::error::{DecodeError, DecodeResult};
use crate::types::{Fixed32, Fixed64, Guid};
use crate::varint::{
    self, DecodeStep, VarIntDecoder, MAX_VAR_U128_BYTES, MAX_VAR_U32_BYTES, MAX_VAR_U64_BYTES,
};
use crate::writer::{GUID_MARKER, NULL_MARKER};

/// Typed reader over a flat slice or a [`SegmentedBuffer`].
///
/// Not thread-safe; one traversal per reader.
pub struct IOReader<'a> {
    inner: LowLevelReader<'a>,
}

impl<'a> IOReader<'a> {
    /// Reads from a flat slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: LowLevelReader::new(data),
        }
    }

    /// Reads from a segmented buffer, holding read access until dropped.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is write-locked.
    #[must_use]
    pub fn from_buffer(buffer: &'a SegmentedBuffer) -> Self {
        Self {
            inner: LowLevelReader::from_buffer(buffer),
        }
    }

    /// Bytes left to read.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    /// Absolute read offset.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.inner.total_offset()
    }

    /// Returns true once every byte has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.inner.remaining() == 0
    }

    /// Skips `count` bytes.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if fewer bytes remain.
    pub fn skip(&mut self, count: usize) -> DecodeResult<()> {
        self.inner.skip_bytes(count)
    }

    /// Moves to an absolute offset.
    ///
    /// # Errors
    ///
    /// [`DecodeError::SeekOutOfRange`] past the end of input.
    pub fn seek(&mut self, offset: usize) -> DecodeResult<()> {
        self.inner.seek(offset)
    }

    /// Runs `decode`, rewinding the cursor if it fails.
    fn atomic<T>(
        &mut self,
        decode: impl FnOnce(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<T> {
        let start = self.inner.position();
        let result = decode(self);
        if result.is_err() {
            self.inner.restore(start);
        }
        result
    }

    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut bytes = [0u8; N];
        self.inner.read_all(&mut bytes)?;
        Ok(bytes)
    }

    // =========================================================================
    // Fixed width
    // =========================================================================

    /// Reads one unsigned byte.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] at end of input.
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        self.inner.read_byte()
    }

    /// Reads one signed byte.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] at end of input.
    pub fn read_i8(&mut self) -> DecodeResult<i8> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    /// Reads a boolean byte.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidBool`] for bytes other than 0 and 1.
    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        self.atomic(|r| match r.inner.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidBool(other)),
        })
    }

    /// Reads a big-endian `u16`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i16`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i32`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `u64`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_u64(&mut self) -> DecodeResult<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i64`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_i64(&mut self) -> DecodeResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Reads a `u128` stored as high then low big-endian halves.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_u128(&mut self) -> DecodeResult<u128> {
        Ok(u128::from_be_bytes(self.read_array()?))
    }

    /// Reads an `i128` stored as high then low big-endian halves.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_i128(&mut self) -> DecodeResult<i128> {
        Ok(i128::from_be_bytes(self.read_array()?))
    }

    /// Reads an `f32` bit pattern.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads an `f64` bit pattern.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a Q16.16 value.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_fixed32(&mut self) -> DecodeResult<Fixed32> {
        Ok(Fixed32::from_raw(self.read_i32()?))
    }

    /// Reads a Q32.32 value.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if the input is too short.
    pub fn read_fixed64(&mut self) -> DecodeResult<Fixed64> {
        Ok(Fixed64::from_raw(self.read_i64()?))
    }

    // =========================================================================
    // Variable length
    // =========================================================================

    fn read_var(&mut self, bits: u32, max_bytes: usize) -> DecodeResult<u128> {
        self.atomic(|r| {
            let mut decoder = VarIntDecoder::new(bits, max_bytes);
            loop {
                match decoder.push(r.inner.read_byte()?) {
                    DecodeStep::Continue => {}
                    DecodeStep::Done(value) => return Ok(value),
                    DecodeStep::TooLong => return Err(DecodeError::InvalidVarInt { max_bytes }),
                    DecodeStep::Overflow => return Err(DecodeError::VarIntOverflow),
                }
            }
        })
    }

    /// Reads an unsigned 32-bit var-int.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidVarInt`] past 5 bytes, [`DecodeError::VarIntOverflow`]
    /// for bits beyond 32, [`DecodeError::UnexpectedEnd`] on truncation.
    pub fn read_var_uint(&mut self) -> DecodeResult<u32> {
        let value = self.read_var(32, MAX_VAR_U32_BYTES)?;
        u32::try_from(value).map_err(|_| DecodeError::VarIntOverflow)
    }

    /// Reads a zig-zag signed 32-bit var-int.
    ///
    /// # Errors
    ///
    /// As [`read_var_uint`](Self::read_var_uint).
    pub fn read_var_int(&mut self) -> DecodeResult<i32> {
        Ok(varint::zigzag_decode_32(self.read_var_uint()?))
    }

    /// Reads an unsigned 64-bit var-int.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidVarInt`] past 10 bytes, [`DecodeError::VarIntOverflow`]
    /// for bits beyond 64, [`DecodeError::UnexpectedEnd`] on truncation.
    pub fn read_var_ulong(&mut self) -> DecodeResult<u64> {
        let value = self.read_var(64, MAX_VAR_U64_BYTES)?;
        u64::try_from(value).map_err(|_| DecodeError::VarIntOverflow)
    }

    /// Reads a zig-zag signed 64-bit var-int.
    ///
    /// # Errors
    ///
    /// As [`read_var_ulong`](Self::read_var_ulong).
    pub fn read_var_long(&mut self) -> DecodeResult<i64> {
        Ok(varint::zigzag_decode_64(self.read_var_ulong()?))
    }

    /// Reads an unsigned 128-bit var-int.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidVarInt`] past 19 bytes, [`DecodeError::VarIntOverflow`]
    /// for bits beyond 128, [`DecodeError::UnexpectedEnd`] on truncation.
    pub fn read_var_u128(&mut self) -> DecodeResult<u128> {
        self.read_var(128, MAX_VAR_U128_BYTES)
    }

    /// Reads a zig-zag signed 128-bit var-int.
    ///
    /// # Errors
    ///
    /// As [`read_var_u128`](Self::read_var_u128).
    pub fn read_var_i128(&mut self) -> DecodeResult<i128> {
        Ok(varint::zigzag_decode_128(self.read_var_u128()?))
    }

    /// Reads a collection length written by `write_var_len`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::LengthExceeded`] if the length is above `max`.
    pub fn read_var_len(&mut self, max: usize) -> DecodeResult<usize> {
        self.atomic(|r| {
            let len = r.read_var_uint()? as usize;
            if len > max {
                return Err(DecodeError::LengthExceeded { length: len, max });
            }
            Ok(len)
        })
    }

    // =========================================================================
    // Strings, byte strings, GUIDs
    // =========================================================================

    /// Reads a signed length prefix; `None` is the null sentinel. The length
    /// is checked against `max` and the remaining input before any allocation.
    fn read_length(&mut self, max: usize) -> DecodeResult<Option<usize>> {
        let prefix = self.read_var_int()?;
        if prefix == -1 {
            return Ok(None);
        }
        let Ok(len) = usize::try_from(prefix) else {
            return Err(DecodeError::InvalidLength(i64::from(prefix)));
        };
        if len > max {
            return Err(DecodeError::LengthExceeded { length: len, max });
        }
        let remaining = self.inner.remaining();
        if len > remaining {
            return Err(DecodeError::UnexpectedEnd {
                needed: len,
                remaining,
            });
        }
        Ok(Some(len))
    }

    /// Reads a nullable UTF-8 string of at most `max` bytes.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidUtf8`] for malformed payloads (never substituted),
    /// [`DecodeError::LengthExceeded`] above `max`, [`DecodeError::InvalidLength`]
    /// for negative prefixes other than `-1`.
    pub fn read_string(&mut self, max: usize) -> DecodeResult<Option<String>> {
        self.atomic(|r| {
            let Some(len) = r.read_length(max)? else {
                return Ok(None);
            };
            let contiguous = r.inner.contiguous();
            if contiguous.len() >= len {
                let text = std::str::from_utf8(&contiguous[..len])
                    .map_err(|_| DecodeError::InvalidUtf8)?
                    .to_owned();
                r.inner.skip_bytes(len)?;
                return Ok(Some(text));
            }
            let mut bytes = vec![0u8; len];
            r.inner.read_all(&mut bytes)?;
            String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| DecodeError::InvalidUtf8)
        })
    }

    /// Reads a string that must not be null.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedNull`] for the null sentinel, otherwise as
    /// [`read_string`](Self::read_string).
    pub fn read_required_string(&mut self, max: usize) -> DecodeResult<String> {
        self.atomic(|r| r.read_string(max)?.ok_or(DecodeError::UnexpectedNull))
    }

    /// Reads a nullable byte string of at most `max` bytes.
    ///
    /// # Errors
    ///
    /// [`DecodeError::LengthExceeded`] above `max`, [`DecodeError::UnexpectedEnd`]
    /// if the declared length exceeds the remaining input.
    pub fn read_byte_string(&mut self, max: usize) -> DecodeResult<Option<Vec<u8>>> {
        self.atomic(|r| {
            let Some(len) = r.read_length(max)? else {
                return Ok(None);
            };
            let mut bytes = vec![0u8; len];
            r.inner.read_all(&mut bytes)?;
            Ok(Some(bytes))
        })
    }

    /// Reads a non-null GUID.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedNull`] for the null marker,
    /// [`DecodeError::InvalidGuidMarker`] for any other marker.
    pub fn read_guid(&mut self) -> DecodeResult<Guid> {
        self.atomic(|r| r.read_nullable_guid()?.ok_or(DecodeError::UnexpectedNull))
    }

    /// Reads a GUID or the null marker.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidGuidMarker`] for an unknown marker byte.
    pub fn read_nullable_guid(&mut self) -> DecodeResult<Option<Guid>> {
        self.atomic(|r| match r.inner.read_byte()? {
            NULL_MARKER => Ok(None),
            GUID_MARKER => Ok(Some(Guid::from_bytes(r.read_array()?))),
            other => Err(DecodeError::InvalidGuidMarker(other)),
        })
    }

    /// Fills `dst` with raw bytes.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnexpectedEnd`] if fewer than `dst.len()` bytes remain.
    pub fn read_raw(&mut self, dst: &mut [u8]) -> DecodeResult<()> {
        self.inner.read_all(dst)
    }
}
