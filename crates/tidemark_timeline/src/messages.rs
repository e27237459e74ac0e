//! # Wire Messages
//!
//! Closed sets of client and server messages, each a var-uint tag followed
//! by the variant body.
//!
//! ```text
//! ClientMessage                      ServerMessage
//!   0  EnqueueActions { actions }      0  TimelineUpdate(..)
//!   1  ChecksumMismatch(report)        1  WirePong { id }
//!   2  WirePing { id }                 2  TraceReply { id, action_queue_ms }
//!   3  TraceQuery { id }
//! ```
//!
//! Actions are opaque to this crate and go through [`WireAction`].

use tidemark_io::{encode_to_vec, DecodeError, DecodeResult, IOReader, IOWriter};

use crate::journal::{ChecksumConflict, OpRecord};
use crate::ops::{OpKind, TimelineUpdateMessage};
use crate::position::JournalPosition;

/// Upper bounds applied while decoding untrusted frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum UTF-8 string payload in bytes.
    pub max_string_bytes: usize,
    /// Maximum byte-string payload in bytes.
    pub max_byte_string_bytes: usize,
    /// Maximum element count of any sequence (ops, actions, checksums).
    pub max_ops: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_string_bytes: 64 * 1024,
            max_byte_string_bytes: 1024 * 1024,
            max_ops: 4096,
        }
    }
}

/// An action type that can travel on the wire.
pub trait WireAction: Sized {
    /// Writes the action.
    fn encode(&self, writer: &mut IOWriter<'_>);

    /// Reads an action written by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Any codec error; the enclosing message is dropped.
    fn decode(reader: &mut IOReader<'_>, limits: &DecodeLimits) -> DecodeResult<Self>;
}

impl WireAction for u32 {
    fn encode(&self, writer: &mut IOWriter<'_>) {
        writer.write_var_uint(*self);
    }

    fn decode(reader: &mut IOReader<'_>, _: &DecodeLimits) -> DecodeResult<Self> {
        reader.read_var_uint()
    }
}

impl WireAction for i64 {
    fn encode(&self, writer: &mut IOWriter<'_>) {
        writer.write_var_long(*self);
    }

    fn decode(reader: &mut IOReader<'_>, _: &DecodeLimits) -> DecodeResult<Self> {
        reader.read_var_long()
    }
}

impl WireAction for String {
    fn encode(&self, writer: &mut IOWriter<'_>) {
        writer.write_str(self);
    }

    fn decode(reader: &mut IOReader<'_>, limits: &DecodeLimits) -> DecodeResult<Self> {
        reader.read_required_string(limits.max_string_bytes)
    }
}

// =============================================================================
// Client -> server
// =============================================================================

/// Diagnostic sent upstream when the local model diverges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MismatchReport<A> {
    /// Position of the diverging op.
    pub position: JournalPosition,
    /// Server-declared digest.
    pub expected: u32,
    /// Locally computed digest.
    pub actual: u32,
    /// Ops since the last verified position.
    pub ops: Vec<OpRecord<A>>,
    /// Serialized local state after the diverging op.
    pub snapshot: Vec<u8>,
}

impl<A: Clone> From<&ChecksumConflict<A>> for MismatchReport<A> {
    fn from(conflict: &ChecksumConflict<A>) -> Self {
        Self {
            position: conflict.position,
            expected: conflict.expected,
            actual: conflict.actual,
            ops: conflict.ops.clone(),
            snapshot: conflict.snapshot.clone(),
        }
    }
}

/// Messages sent by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage<A> {
    /// Local actions to queue on the server.
    EnqueueActions {
        /// Actions in submission order.
        actions: Vec<A>,
    },
    /// Local model diverged from the server.
    ChecksumMismatch(MismatchReport<A>),
    /// Transport-level round-trip probe.
    WirePing {
        /// Probe identifier.
        id: u32,
    },
    /// Application-level round-trip probe.
    TraceQuery {
        /// Probe identifier.
        id: u32,
    },
}

impl<A: WireAction> ClientMessage<A> {
    /// Writes the message.
    pub fn encode(&self, writer: &mut IOWriter<'_>) {
        match self {
            Self::EnqueueActions { actions } => {
                writer.write_var_uint(0);
                writer.write_var_len(actions.len());
                for action in actions {
                    action.encode(writer);
                }
            }
            Self::ChecksumMismatch(report) => {
                writer.write_var_uint(1);
                report.position.encode(writer);
                writer.write_u32(report.expected);
                writer.write_u32(report.actual);
                writer.write_var_len(report.ops.len());
                for record in &report.ops {
                    encode_record(writer, record);
                }
                writer.write_byte_string(Some(report.snapshot.as_slice()));
            }
            Self::WirePing { id } => {
                writer.write_var_uint(2);
                writer.write_var_uint(*id);
            }
            Self::TraceQuery { id } => {
                writer.write_var_uint(3);
                writer.write_var_uint(*id);
            }
        }
    }

    /// Reads a message written by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnknownTag`] for an unknown variant, or any codec error.
    pub fn decode(reader: &mut IOReader<'_>, limits: &DecodeLimits) -> DecodeResult<Self> {
        match reader.read_var_uint()? {
            0 => {
                let count = reader.read_var_len(limits.max_ops)?;
                let mut actions = Vec::with_capacity(count);
                for _ in 0..count {
                    actions.push(A::decode(reader, limits)?);
                }
                Ok(Self::EnqueueActions { actions })
            }
            1 => {
                let position = JournalPosition::decode(reader)?;
                let expected = reader.read_u32()?;
                let actual = reader.read_u32()?;
                let count = reader.read_var_len(limits.max_ops)?;
                let mut ops = Vec::with_capacity(count);
                for _ in 0..count {
                    ops.push(decode_record(reader, limits)?);
                }
                let snapshot = reader
                    .read_byte_string(limits.max_byte_string_bytes)?
                    .ok_or(DecodeError::UnexpectedNull)?;
                Ok(Self::ChecksumMismatch(MismatchReport {
                    position,
                    expected,
                    actual,
                    ops,
                    snapshot,
                }))
            }
            2 => Ok(Self::WirePing {
                id: reader.read_var_uint()?,
            }),
            3 => Ok(Self::TraceQuery {
                id: reader.read_var_uint()?,
            }),
            tag => Err(DecodeError::UnknownTag {
                kind: "ClientMessage",
                tag,
            }),
        }
    }

    /// Encodes into a standalone frame.
    #[must_use]
    pub fn to_frame(&self) -> Vec<u8> {
        encode_to_vec(|w| self.encode(w))
    }

    /// Decodes a standalone frame.
    ///
    /// # Errors
    ///
    /// As [`decode`](Self::decode).
    pub fn from_frame(frame: &[u8], limits: &DecodeLimits) -> DecodeResult<Self> {
        Self::decode(&mut IOReader::new(frame), limits)
    }
}

fn encode_record<A: WireAction>(writer: &mut IOWriter<'_>, record: &OpRecord<A>) {
    record.position.encode(writer);
    match &record.op {
        OpKind::Action(action) => {
            writer.write_bool(true);
            action.encode(writer);
        }
        OpKind::Tick => writer.write_bool(false),
    }
}

fn decode_record<A: WireAction>(
    reader: &mut IOReader<'_>,
    limits: &DecodeLimits,
) -> DecodeResult<OpRecord<A>> {
    let position = JournalPosition::decode(reader)?;
    let op = if reader.read_bool()? {
        OpKind::Action(A::decode(reader, limits)?)
    } else {
        OpKind::Tick
    };
    Ok(OpRecord { position, op })
}

// =============================================================================
// Server -> client
// =============================================================================

/// Messages sent by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage<A> {
    /// A batch of timeline ops.
    TimelineUpdate(TimelineUpdateMessage<A>),
    /// Reply to [`ClientMessage::WirePing`].
    WirePong {
        /// Probe identifier echoed back.
        id: u32,
    },
    /// Reply to [`ClientMessage::TraceQuery`].
    TraceReply {
        /// Probe identifier echoed back.
        id: u32,
        /// How long a submitted action currently waits in the server queue.
        action_queue_ms: u32,
    },
}

impl<A: WireAction> ServerMessage<A> {
    /// Writes the message.
    pub fn encode(&self, writer: &mut IOWriter<'_>) {
        match self {
            Self::TimelineUpdate(update) => {
                writer.write_var_uint(0);
                writer.write_var_len(update.ops.len());
                for op in &update.ops {
                    match op {
                        Some(action) => {
                            writer.write_bool(true);
                            action.encode(writer);
                        }
                        None => writer.write_bool(false),
                    }
                }
                writer.write_u32(update.final_checksum);
                match &update.debug_checksums {
                    Some(list) => {
                        writer.write_bool(true);
                        writer.write_var_len(list.len());
                        for checksum in list {
                            writer.write_u32(*checksum);
                        }
                    }
                    None => writer.write_bool(false),
                }
            }
            Self::WirePong { id } => {
                writer.write_var_uint(1);
                writer.write_var_uint(*id);
            }
            Self::TraceReply {
                id,
                action_queue_ms,
            } => {
                writer.write_var_uint(2);
                writer.write_var_uint(*id);
                writer.write_var_uint(*action_queue_ms);
            }
        }
    }

    /// Reads a message written by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnknownTag`] for an unknown variant, or any codec error.
    pub fn decode(reader: &mut IOReader<'_>, limits: &DecodeLimits) -> DecodeResult<Self> {
        match reader.read_var_uint()? {
            0 => {
                let count = reader.read_var_len(limits.max_ops)?;
                let mut ops = Vec::with_capacity(count);
                for _ in 0..count {
                    let op = if reader.read_bool()? {
                        Some(A::decode(reader, limits)?)
                    } else {
                        None
                    };
                    ops.push(op);
                }
                let final_checksum = reader.read_u32()?;
                let debug_checksums = if reader.read_bool()? {
                    let count = reader.read_var_len(limits.max_ops)?;
                    let mut list = Vec::with_capacity(count);
                    for _ in 0..count {
                        list.push(reader.read_u32()?);
                    }
                    Some(list)
                } else {
                    None
                };
                Ok(Self::TimelineUpdate(TimelineUpdateMessage {
                    ops,
                    final_checksum,
                    debug_checksums,
                }))
            }
            1 => Ok(Self::WirePong {
                id: reader.read_var_uint()?,
            }),
            2 => Ok(Self::TraceReply {
                id: reader.read_var_uint()?,
                action_queue_ms: reader.read_var_uint()?,
            }),
            tag => Err(DecodeError::UnknownTag {
                kind: "ServerMessage",
                tag,
            }),
        }
    }

    /// Encodes into a standalone frame.
    #[must_use]
    pub fn to_frame(&self) -> Vec<u8> {
        encode_to_vec(|w| self.encode(w))
    }

    /// Decodes a standalone frame.
    ///
    /// # Errors
    ///
    /// As [`decode`](Self::decode).
    pub fn from_frame(frame: &[u8], limits: &DecodeLimits) -> DecodeResult<Self> {
        Self::decode(&mut IOReader::new(frame), limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> DecodeLimits {
        DecodeLimits::default()
    }

    #[test]
    fn test_timeline_update_layout() {
        let message: ServerMessage<u32> = ServerMessage::TimelineUpdate(TimelineUpdateMessage {
            ops: vec![Some(300), None],
            final_checksum: 0x0102_0304,
            debug_checksums: None,
        });
        let frame = message.to_frame();
        assert_eq!(
            frame,
            vec![0x00, 0x02, 0x01, 0xAC, 0x02, 0x00, 0x01, 0x02, 0x03, 0x04, 0x00]
        );
        assert_eq!(ServerMessage::from_frame(&frame, &limits()).unwrap(), message);
    }

    #[test]
    fn test_debug_checksums_round_trip() {
        let message: ServerMessage<String> = ServerMessage::TimelineUpdate(TimelineUpdateMessage {
            ops: vec![Some("jump".to_owned()), None],
            final_checksum: 5,
            debug_checksums: Some(vec![4, 5]),
        });
        let frame = message.to_frame();
        assert_eq!(ServerMessage::from_frame(&frame, &limits()).unwrap(), message);
    }

    #[test]
    fn test_mismatch_report_round_trip() {
        let message: ClientMessage<i64> = ClientMessage::ChecksumMismatch(MismatchReport {
            position: JournalPosition::new(12, 0, 0),
            expected: 1,
            actual: 2,
            ops: vec![
                OpRecord {
                    position: JournalPosition::new(11, 1, 0),
                    op: OpKind::Action(-4),
                },
                OpRecord {
                    position: JournalPosition::new(12, 0, 0),
                    op: OpKind::Tick,
                },
            ],
            snapshot: vec![9, 9, 9],
        });
        let frame = message.to_frame();
        assert_eq!(ClientMessage::from_frame(&frame, &limits()).unwrap(), message);
    }

    #[test]
    fn test_probe_messages() {
        for message in [
            ClientMessage::<u32>::WirePing { id: 7 },
            ClientMessage::TraceQuery { id: 8 },
            ClientMessage::EnqueueActions {
                actions: vec![1, 2, 3],
            },
        ] {
            let frame = message.to_frame();
            assert_eq!(ClientMessage::from_frame(&frame, &limits()).unwrap(), message);
        }
        let reply: ServerMessage<u32> = ServerMessage::TraceReply {
            id: 8,
            action_queue_ms: 40,
        };
        assert_eq!(ServerMessage::from_frame(&reply.to_frame(), &limits()).unwrap(), reply);
    }

    #[test]
    fn test_unknown_tag() {
        let result = ServerMessage::<u32>::from_frame(&[0x09], &limits());
        assert_eq!(
            result,
            Err(DecodeError::UnknownTag {
                kind: "ServerMessage",
                tag: 9
            })
        );
    }

    #[test]
    fn test_op_count_limit() {
        let message: ServerMessage<u32> = ServerMessage::TimelineUpdate(TimelineUpdateMessage {
            ops: vec![None; 10],
            final_checksum: 0,
            debug_checksums: None,
        });
        let tight = DecodeLimits {
            max_ops: 4,
            ..DecodeLimits::default()
        };
        assert_eq!(
            ServerMessage::<u32>::from_frame(&message.to_frame(), &tight),
            Err(DecodeError::LengthExceeded { length: 10, max: 4 })
        );
    }

    #[test]
    fn test_truncated_frame() {
        let message: ClientMessage<u32> = ClientMessage::EnqueueActions {
            actions: vec![1, 2],
        };
        let frame = message.to_frame();
        assert!(ClientMessage::<u32>::from_frame(&frame[..frame.len() - 1], &limits()).is_err());
    }
}
