//! # Playback Operations
//!
//! A timeline is an ordered stream of actions and ticks. Only some ops carry
//! checksums: normally the last op of each server message.
//!
//! ```text
//! TimelineUpdateMessage { ops: [Some(a), Some(b), None], final_checksum: c }
//!
//!   → [Action(a), Action(b), Tick + [c]]
//! ```

/// What an op does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpKind<A> {
    /// Apply an action.
    Action(A),
    /// Advance one tick.
    Tick,
}

impl<A> OpKind<A> {
    /// Returns true for [`OpKind::Tick`].
    #[inline]
    #[must_use]
    pub const fn is_tick(&self) -> bool {
        matches!(self, Self::Tick)
    }
}

/// One buffered op with the digests the server declared for the state right
/// after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackOp<A> {
    /// The operation.
    pub kind: OpKind<A>,
    /// Expected checksums; every entry must match. Usually empty.
    pub checksums: Vec<u32>,
}

impl<A> PlaybackOp<A> {
    /// An action without checksums.
    #[must_use]
    pub fn action(action: A) -> Self {
        Self {
            kind: OpKind::Action(action),
            checksums: Vec::new(),
        }
    }

    /// A tick without checksums.
    #[must_use]
    pub const fn tick() -> Self {
        Self {
            kind: OpKind::Tick,
            checksums: Vec::new(),
        }
    }

    /// Adds an expected checksum.
    #[must_use]
    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksums.push(checksum);
        self
    }

    /// Returns true for ticks.
    #[inline]
    #[must_use]
    pub const fn is_tick(&self) -> bool {
        self.kind.is_tick()
    }

    /// Returns true if a commit should verify this op.
    #[inline]
    #[must_use]
    pub fn has_checksum(&self) -> bool {
        !self.checksums.is_empty()
    }
}

/// A server-pushed batch of timeline ops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineUpdateMessage<A> {
    /// `None` is a tick, `Some` is an action.
    pub ops: Vec<Option<A>>,
    /// Digest of the state after the last op.
    pub final_checksum: u32,
    /// Per-op digests, sent only in enhanced-debug sessions.
    pub debug_checksums: Option<Vec<u32>>,
}

impl<A> TimelineUpdateMessage<A> {
    /// Number of ticks in the batch.
    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_none()).count()
    }

    /// Converts into playback ops.
    ///
    /// The final checksum attaches to the last op. Debug checksums attach to
    /// their ops when `use_debug_checksums` is set and the list lines up with
    /// the ops; a misaligned list is ignored. An empty batch has nothing to
    /// verify, so its final checksum is dropped.
    #[must_use]
    pub fn into_playback_ops(self, use_debug_checksums: bool) -> Vec<PlaybackOp<A>> {
        let debug = self
            .debug_checksums
            .filter(|list| use_debug_checksums && list.len() == self.ops.len());
        let mut ops: Vec<PlaybackOp<A>> = self
            .ops
            .into_iter()
            .map(|op| match op {
                Some(action) => PlaybackOp::action(action),
                None => PlaybackOp::tick(),
            })
            .collect();
        if let Some(debug) = debug {
            for (op, checksum) in ops.iter_mut().zip(debug) {
                op.checksums.push(checksum);
            }
        }
        match ops.last_mut() {
            Some(last) => last.checksums.push(self.final_checksum),
            None => tracing::debug!(
                checksum = self.final_checksum,
                "empty timeline update, final checksum dropped"
            ),
        }
        ops
    }
}
