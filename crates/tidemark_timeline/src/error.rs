//! # Timeline Error Types
//!
//! Misuse of the journal API and configuration failures.
//!
//! A checksum mismatch is NOT an error: it is returned as
//! [`CommitOutcome::Conflict`](crate::CommitOutcome::Conflict).

use thiserror::Error;

use crate::position::JournalPosition;

/// Errors returned by [`ModelJournal`](crate::ModelJournal).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// Commit target lies past everything staged so far.
    #[error("commit target {target} is beyond staged position {staged}")]
    CommitBeyondStaged {
        /// Requested commit position.
        target: JournalPosition,
        /// Current staged position.
        staged: JournalPosition,
    },
}

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors loading or validating a [`PlaybackConfig`](crate::PlaybackConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The TOML text could not be parsed.
    #[error("failed to parse playback config: {0}")]
    Parse(String),

    /// A field holds a value outside its valid range.
    #[error("invalid playback config: {0}")]
    Invalid(String),
}
