//! # Tidemark Timeline - Deterministic Playback
//!
//! Plays a server-authored timeline of actions and ticks into a local,
//! deterministic model and verifies it against server checksums.
//!
//! ## Architecture
//!
//! ```text
//!   server ──frames──► Transport ──► PlaybackController ──► ModelJournal
//!                                      │   │                  │
//!                         ArrivalHistory   LatencyTracker     SimulationModel
//! ```
//!
//! - **Journal**: [`ModelJournal`] keeps a committed checkpoint and a staged
//!   working copy; commits verify declared checksums
//! - **Controller**: [`PlaybackController`] extracts due ops each frame, paces
//!   presentation against network jitter and reports divergence upstream
//! - **Messages**: [`ClientMessage`] / [`ServerMessage`] on the
//!   [`tidemark_io`] codec
//!
//! ## Failure Model
//!
//! A checksum mismatch is data, not an error: the journal returns
//! [`CommitOutcome::Conflict`], the controller sends one
//! [`MismatchReport`] and keeps playing in a known-desynced state.
//!
//! ## Example
//!
//! ```rust
//! use tidemark_io::IOWriter;
//! use tidemark_timeline::{JournalPosition, ModelJournal, SimulationModel};
//!
//! #[derive(Clone, Default)]
//! struct Score {
//!     position: JournalPosition,
//!     points: u32,
//! }
//!
//! impl SimulationModel for Score {
//!     type Action = u32;
//!
//!     fn apply_action(&mut self, action: &u32) {
//!         self.points += action;
//!         self.position = self.position.next_operation();
//!     }
//!
//!     fn advance_tick(&mut self) {
//!         self.position = self.position.next_tick();
//!     }
//!
//!     fn position(&self) -> JournalPosition {
//!         self.position
//!     }
//!
//!     fn serialize_state(&self, writer: &mut IOWriter<'_>) {
//!         self.position.encode(writer);
//!         writer.write_u32(self.points);
//!     }
//! }
//!
//! let mut journal = ModelJournal::new(Score::default(), 64);
//! journal.stage_action(3, Vec::new());
//! let tick = journal.stage_tick(vec![0]);
//! assert!(journal.commit(tick).unwrap().is_conflict());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod jitter;
pub mod journal;
pub mod latency;
pub mod messages;
pub mod model;
pub mod ops;
pub mod position;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Pacing, PlaybackConfig};
pub use controller::{ChannelState, PlaybackController, UpdateReport};
pub use error::{ConfigError, JournalError, JournalResult};
pub use events::PlaybackEvent;
pub use jitter::ArrivalHistory;
pub use journal::{ChecksumConflict, CommitOutcome, ModelJournal, OpRecord};
pub use latency::{LatencySample, LatencyTracker, ProbeReply};
pub use messages::{ClientMessage, DecodeLimits, MismatchReport, ServerMessage, WireAction};
pub use model::{state_checksum, state_snapshot, SimulationModel};
pub use ops::{OpKind, PlaybackOp, TimelineUpdateMessage};
pub use position::JournalPosition;
pub use transport::{ChannelPeer, ChannelTransport, Transport, TransportStats};
