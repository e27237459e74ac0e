//! # Playback Events
//!
//! Diagnostics queued by the controller during `update` and drained by the
//! owning application. Regime changes (stall, fast-forward) are reported once
//! per transition, never per frame.

use crate::journal::ChecksumConflict;
use crate::latency::LatencySample;

/// Something the application may want to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent<A> {
    /// Playback ran out of received ticks.
    StallStarted {
        /// Last presented tick.
        tick: i64,
    },
    /// Playback resumed after a stall.
    StallEnded {
        /// First tick presented after the stall.
        tick: i64,
        /// How long the stall lasted.
        stalled_ms: i64,
    },
    /// The held buffer exceeds what jitter needs; playback speeds up.
    FastForwardStarted {
        /// Buffer excess when catch-up began.
        excess_ms: i64,
    },
    /// Catch-up finished.
    FastForwardEnded,
    /// The local model diverged from the server.
    ChecksumMismatch(ChecksumConflict<A>),
    /// A latency probe completed.
    LatencyMeasured(LatencySample),
    /// The channel was lost; no more playback happens.
    Disconnected,
}
