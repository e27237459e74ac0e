//! # Variable-Length Integers
//!
//! 7 payload bits per byte, least-significant group first, bit 7 set on every
//! byte except the last. Signed values are zig-zag mapped first so that small
//! magnitudes of either sign stay short.
//!
//! ```text
//! 300  = 0b1_0010_1100
//!      → [0b1010_1100, 0b0000_0010] = [0xAC, 0x02]
//!
//! zigzag(-1) = 1 → [0x01]
//! zigzag( 1) = 2 → [0x02]
//! ```

/// Maximum encoded length of a 32-bit varint.
pub const MAX_VAR_U32_BYTES: usize = 5;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VAR_U64_BYTES: usize = 10;

/// Maximum encoded length of a 128-bit varint.
pub const MAX_VAR_U128_BYTES: usize = 19;

/// Continuation flag.
const CONTINUE: u8 = 0x80;

/// Payload mask.
const PAYLOAD: u8 = 0x7F;

/// Maps a signed 32-bit value onto an unsigned one, sign in the low bit.
#[inline]
#[must_use]
pub const fn zigzag_encode_32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode_32`].
#[inline]
#[must_use]
pub const fn zigzag_decode_32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Maps a signed 64-bit value onto an unsigned one, sign in the low bit.
#[inline]
#[must_use]
pub const fn zigzag_encode_64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode_64`].
#[inline]
#[must_use]
pub const fn zigzag_decode_64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Maps a signed 128-bit value onto an unsigned one, sign in the low bit.
#[inline]
#[must_use]
pub const fn zigzag_encode_128(value: i128) -> u128 {
    ((value << 1) ^ (value >> 127)) as u128
}

/// Inverse of [`zigzag_encode_128`].
#[inline]
#[must_use]
pub const fn zigzag_decode_128(value: u128) -> i128 {
    ((value >> 1) as i128) ^ -((value & 1) as i128)
}

/// Encodes `value` into `out`, returning the number of bytes used.
///
/// # Panics
///
/// Panics if `out` is shorter than the encoding (at most 10 bytes).
#[inline]
pub fn encode_u64(mut value: u64, out: &mut [u8]) -> usize {
    let mut index = 0;
    while value >= u64::from(CONTINUE) {
        out[index] = (value as u8) | CONTINUE;
        value >>= 7;
        index += 1;
    }
    out[index] = value as u8;
    index + 1
}

/// Encodes `value` into `out`, returning the number of bytes used.
///
/// # Panics
///
/// Panics if `out` is shorter than the encoding (at most 19 bytes).
#[inline]
pub fn encode_u128(mut value: u128, out: &mut [u8]) -> usize {
    let mut index = 0;
    while value >= u128::from(CONTINUE) {
        out[index] = (value as u8) | CONTINUE;
        value >>= 7;
        index += 1;
    }
    out[index] = value as u8;
    index + 1
}

/// Number of bytes [`encode_u128`] produces for `value`.
#[inline]
#[must_use]
pub const fn encoded_len(value: u128) -> usize {
    let bits = 128 - value.leading_zeros() as usize;
    if bits == 0 {
        1
    } else {
        (bits + 6) / 7
    }
}

/// Outcome of feeding one byte to a [`VarIntDecoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeStep {
    /// More bytes are needed.
    Continue,
    /// The value is complete.
    Done(u128),
    /// The encoding ran past `max_bytes`.
    TooLong,
    /// Payload bits landed beyond the target width.
    Overflow,
}

/// Incremental varint decoder for a target width of `bits`.
#[derive(Clone, Copy, Debug)]
pub struct VarIntDecoder {
    value: u128,
    shift: u32,
    count: usize,
    bits: u32,
    max_bytes: usize,
}

impl VarIntDecoder {
    /// Creates a decoder for integers of `bits` width.
    #[must_use]
    pub const fn new(bits: u32, max_bytes: usize) -> Self {
        Self {
            value: 0,
            shift: 0,
            count: 0,
            bits,
            max_bytes,
        }
    }

    /// Feeds the next byte.
    pub fn push(&mut self, byte: u8) -> DecodeStep {
        self.count += 1;
        let payload = u128::from(byte & PAYLOAD);
        let room = self.bits.saturating_sub(self.shift);
        if room < 7 && (payload >> room) != 0 {
            return DecodeStep::Overflow;
        }
        if payload != 0 {
            self.value |= payload << self.shift;
        }
        if byte & CONTINUE == 0 {
            return DecodeStep::Done(self.value);
        }
        if self.count >= self.max_bytes {
            return DecodeStep::TooLong;
        }
        self.shift += 7;
        DecodeStep::Continue
    }
}
