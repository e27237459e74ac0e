//! # Tidemark IO - The Wire Format
//!
//! Byte storage and the binary codec shared by every Tidemark peer.
//!
//! ## Architecture
//!
//! - **Buffer**: [`SegmentedBuffer`], an append-only store of growable
//!   segments with a cooperative one-writer / many-readers lock
//! - **Cursor**: [`LowLevelReader`] / [`LowLevelWriter`], byte cursors that
//!   cross segment boundaries transparently
//! - **Codec**: [`IOReader`] / [`IOWriter`], typed encoders and decoders
//!
//! ## Layering
//!
//! ```text
//!   IOWriter ──► LowLevelWriter ──► get_memory / commit_memory ─┐
//!                                                               ▼
//!                                                        SegmentedBuffer
//!                                                               ▲
//!   IOReader ──► LowLevelReader ──► read_scope / segment(i) ────┘
//! ```
//!
//! ## Failure Model
//!
//! - Malformed input is a [`DecodeError`]. The failed read leaves the cursor
//!   where it started; nothing else is affected.
//! - Lock-discipline violations are programmer errors and panic.
//!
//! ## Example
//!
//! ```rust
//! use tidemark_io::{IOReader, encode_to_vec};
//!
//! let bytes = encode_to_vec(|w| {
//!     w.write_var_uint(300);
//!     w.write_string(Some("tide"));
//! });
//! assert_eq!(&bytes[..2], &[0xAC, 0x02]);
//!
//! let mut reader = IOReader::new(&bytes);
//! assert_eq!(reader.read_var_uint().unwrap(), 300);
//! assert_eq!(reader.read_string(64).unwrap().as_deref(), Some("tide"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod buffer;
pub mod cursor;
pub mod error;
pub mod reader;
pub mod segment;
pub mod types;
pub mod varint;
pub mod writer;

pub use buffer::{LockState, ReadScope, SegmentedBuffer, WriteScope, DEFAULT_SEGMENT_SIZE};
pub use cursor::{CursorPosition, LowLevelReader, LowLevelWriter, Reservation};
pub use error::{DecodeError, DecodeResult};
pub use reader::IOReader;
pub use segment::{Segment, SegmentPool};
pub use types::{Fixed32, Fixed64, Guid};
pub use varint::{MAX_VAR_U128_BYTES, MAX_VAR_U32_BYTES, MAX_VAR_U64_BYTES};
pub use writer::{encode_to_vec, IOWriter, ReservedSpan, GUID_MARKER, NULL_MARKER};
