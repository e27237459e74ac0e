//! # Decode Error Types
//!
//! Every way a byte stream can fail to decode. All variants are the same
//! failure class: the current decode operation is aborted, the cursor is left
//! where the failed primitive started, and the caller decides what to do with
//! the enclosing message.

use thiserror::Error;

/// Errors produced while decoding the wire format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended before the value was complete.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes the read required.
        needed: usize,
        /// Bytes that were left in the input.
        remaining: usize,
    },

    /// A varint kept its continuation bit set past the maximum length.
    #[error("invalid varint: longer than {max_bytes} bytes")]
    InvalidVarInt {
        /// Maximum encoded length for the target width.
        max_bytes: usize,
    },

    /// A varint carried payload bits beyond the target integer width.
    #[error("varint overflows target width")]
    VarIntOverflow,

    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,

    /// A length prefix was negative (other than the null sentinel).
    #[error("invalid length prefix: {0}")]
    InvalidLength(i64),

    /// A length prefix exceeded the caller's limit or the remaining input.
    #[error("length {length} exceeds limit {max}")]
    LengthExceeded {
        /// Declared length.
        length: usize,
        /// Effective maximum.
        max: usize,
    },

    /// A GUID was not preceded by the 16-byte marker.
    #[error("invalid GUID marker byte 0x{0:02x}")]
    InvalidGuidMarker(u8),

    /// A null value was found where a non-null value is required.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte 0x{0:02x}")]
    InvalidBool(u8),

    /// Seek target lies beyond the end of the input.
    #[error("seek to {offset} outside input of {len} bytes")]
    SeekOutOfRange {
        /// Requested absolute offset.
        offset: usize,
        /// Total input length.
        len: usize,
    },

    /// A tagged union carried a tag this build does not know.
    #[error("unknown {kind} tag {tag}")]
    UnknownTag {
        /// Which union was being decoded.
        kind: &'static str,
        /// The tag value read.
        tag: u32,
    },
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
