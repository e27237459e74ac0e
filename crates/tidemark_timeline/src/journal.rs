//! # Model Journal
//!
//! Staged vs committed history of a [`SimulationModel`].
//!
//! ```text
//!              committed (checkpoint)          staged (working copy)
//!                     │                                │
//!   ──────────────────●────────────────────────────────●──────►
//!     history (bounded)   pending: [op, op, op, op]
//!
//!   stage_*()  apply to the working copy, push to pending
//!   commit(p)  re-apply pending ops up to p onto the checkpoint and verify
//!              every declared checksum
//! ```
//!
//! ## Conflicts
//!
//! A checksum mismatch does not stop the commit: the checkpoint still moves
//! forward and the divergence is returned as [`CommitOutcome::Conflict`]. The
//! journal stays desynced until [`ModelJournal::reset`] installs an
//! authoritative model.

use std::collections::VecDeque;

use crate::error::{JournalError, JournalResult};
use crate::model::{state_snapshot, SimulationModel};
use crate::ops::{OpKind, PlaybackOp};
use crate::position::JournalPosition;

/// A committed (or committing) op and the position it produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpRecord<A> {
    /// Model position right after the op.
    pub position: JournalPosition,
    /// The op itself.
    pub op: OpKind<A>,
}

/// A locally computed digest that disagrees with the server's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecksumConflict<A> {
    /// Position of the first op whose digest disagreed.
    pub position: JournalPosition,
    /// Server-declared digest.
    pub expected: u32,
    /// Locally computed digest.
    pub actual: u32,
    /// Committed position before this commit.
    pub range_start: JournalPosition,
    /// Committed position after this commit.
    pub range_end: JournalPosition,
    /// Ops since the last verified position, up to and including the
    /// diverging op (bounded by the journal's history size).
    pub ops: Vec<OpRecord<A>>,
    /// Serialized local state right after the diverging op.
    pub snapshot: Vec<u8>,
}

/// Result of [`ModelJournal::commit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome<A> {
    /// All verified digests matched (or none were declared).
    Committed {
        /// Committed position after the call.
        position: JournalPosition,
        /// Number of ops committed by this call.
        ops: usize,
    },
    /// A declared digest disagreed. The commit still advanced.
    Conflict(ChecksumConflict<A>),
}

impl<A> CommitOutcome<A> {
    /// Returns true for [`CommitOutcome::Conflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// A staged, not yet committed op.
#[derive(Clone, Debug)]
struct StagedEntry<A> {
    record: OpRecord<A>,
    expected: Vec<u32>,
    /// Digest of the working copy right after the op, when `expected` is set.
    actual: Option<u32>,
}

/// Staged and committed history of one model.
#[derive(Debug)]
pub struct ModelJournal<M: SimulationModel> {
    /// Model at the committed position.
    committed: M,
    /// Model at the staged position.
    staged: M,
    /// Staged ops not yet committed, in order.
    pending: VecDeque<StagedEntry<M::Action>>,
    /// Most recent committed ops.
    history: VecDeque<OpRecord<M::Action>>,
    /// Maximum length of `history`.
    history_limit: usize,
    /// Last committed position whose digest was verified to match.
    last_verified: JournalPosition,
    /// Sticky desync flag.
    desynced: bool,
    /// Conflicts reported since creation.
    conflict_count: u64,
}

impl<M: SimulationModel> ModelJournal<M> {
    /// Creates a journal whose committed and staged state is `model`.
    #[must_use]
    pub fn new(model: M, history_limit: usize) -> Self {
        let position = model.position();
        Self {
            committed: model.clone(),
            staged: model,
            pending: VecDeque::new(),
            history: VecDeque::with_capacity(history_limit),
            history_limit,
            last_verified: position,
            desynced: false,
            conflict_count: 0,
        }
    }

    /// Model at the committed position.
    #[inline]
    #[must_use]
    pub const fn committed_model(&self) -> &M {
        &self.committed
    }

    /// Model at the staged position.
    #[inline]
    #[must_use]
    pub const fn staged_model(&self) -> &M {
        &self.staged
    }

    /// Committed position.
    #[inline]
    #[must_use]
    pub fn committed_position(&self) -> JournalPosition {
        self.committed.position()
    }

    /// Staged position (never behind the committed one).
    #[inline]
    #[must_use]
    pub fn staged_position(&self) -> JournalPosition {
        self.staged.position()
    }

    /// Number of staged ops awaiting commit.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Recently committed ops, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &OpRecord<M::Action>> {
        self.history.iter()
    }

    /// Returns true once a conflict has been seen and not yet reset.
    #[inline]
    #[must_use]
    pub const fn is_desynced(&self) -> bool {
        self.desynced
    }

    /// Conflicts reported since creation.
    #[inline]
    #[must_use]
    pub const fn conflict_count(&self) -> u64 {
        self.conflict_count
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Applies an action to the working copy.
    ///
    /// # Panics
    ///
    /// Panics if the model does not advance its position.
    pub fn stage_action(&mut self, action: M::Action, expected: Vec<u32>) -> JournalPosition {
        self.stage(PlaybackOp {
            kind: OpKind::Action(action),
            checksums: expected,
        })
    }

    /// Applies a tick to the working copy.
    ///
    /// # Panics
    ///
    /// Panics if the model does not advance its position.
    pub fn stage_tick(&mut self, expected: Vec<u32>) -> JournalPosition {
        self.stage(PlaybackOp {
            kind: OpKind::Tick,
            checksums: expected,
        })
    }

    /// Applies any op to the working copy and returns the new staged position.
    ///
    /// # Panics
    ///
    /// Panics if the model does not advance its position.
    pub fn stage(&mut self, op: PlaybackOp<M::Action>) -> JournalPosition {
        let before = self.staged.position();
        apply(&mut self.staged, &op.kind);
        let position = self.staged.position();
        assert!(
            position > before,
            "model position did not advance: {before} -> {position}"
        );
        let actual = (!op.checksums.is_empty()).then(|| self.staged.checksum());
        self.pending.push_back(StagedEntry {
            record: OpRecord {
                position,
                op: op.kind,
            },
            expected: op.checksums,
            actual,
        });
        position
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Confirms every staged op at or before `target`.
    ///
    /// Never moves the committed position backward; a target at or behind it
    /// commits nothing.
    ///
    /// # Errors
    ///
    /// [`JournalError::CommitBeyondStaged`] if `target` is past the staged
    /// position.
    pub fn commit(&mut self, target: JournalPosition) -> JournalResult<CommitOutcome<M::Action>> {
        let staged = self.staged.position();
        if target > staged {
            return Err(JournalError::CommitBeyondStaged { target, staged });
        }

        let range_start = self.committed.position();
        let mut committed_ops = 0;
        let mut conflict: Option<(JournalPosition, u32, u32, Vec<u8>)> = None;

        while self
            .pending
            .front()
            .is_some_and(|entry| entry.record.position <= target)
        {
            let Some(entry) = self.pending.pop_front() else {
                break;
            };
            apply(&mut self.committed, &entry.record.op);
            committed_ops += 1;

            if let Some(actual) = entry.actual {
                match entry.expected.iter().find(|&&expected| expected != actual) {
                    Some(&expected) => {
                        if conflict.is_none() {
                            let snapshot = state_snapshot(&self.committed);
                            conflict = Some((entry.record.position, expected, actual, snapshot));
                        }
                    }
                    None if conflict.is_none() && !self.desynced => {
                        self.last_verified = entry.record.position;
                    }
                    None => {}
                }
            }
            self.push_history(entry.record);
        }

        let range_end = self.committed.position();
        let Some((position, expected, actual, snapshot)) = conflict else {
            if committed_ops > 0 {
                tracing::debug!(
                    from = %range_start,
                    to = %range_end,
                    ops = committed_ops,
                    "journal commit"
                );
            }
            return Ok(CommitOutcome::Committed {
                position: range_end,
                ops: committed_ops,
            });
        };

        self.desynced = true;
        self.conflict_count += 1;
        let ops = self
            .history
            .iter()
            .filter(|record| record.position > self.last_verified && record.position <= position)
            .cloned()
            .collect();
        tracing::warn!(
            tick = position.tick,
            operation = position.operation,
            step = position.step,
            expected,
            actual,
            "checksum mismatch on commit"
        );
        Ok(CommitOutcome::Conflict(ChecksumConflict {
            position,
            expected,
            actual,
            range_start,
            range_end,
            ops,
            snapshot,
        }))
    }

    /// Commits everything staged.
    ///
    /// # Errors
    ///
    /// Never fails in practice; see [`commit`](Self::commit).
    pub fn commit_all(&mut self) -> JournalResult<CommitOutcome<M::Action>> {
        self.commit(self.staged.position())
    }

    // =========================================================================
    // Replay and resync
    // =========================================================================

    /// Rebuilds the working copy from the checkpoint by re-applying every
    /// pending op. Returns the resulting checksum.
    pub fn replay_from_checkpoint(&mut self) -> u32 {
        let mut model = self.committed.clone();
        for entry in &mut self.pending {
            apply(&mut model, &entry.record.op);
            if !entry.expected.is_empty() {
                entry.actual = Some(model.checksum());
            }
        }
        self.staged = model;
        self.staged.checksum()
    }

    /// Replaces the whole history with an authoritative model.
    pub fn reset(&mut self, model: M) {
        let position = model.position();
        tracing::info!(position = %position, "journal reset");
        self.committed = model.clone();
        self.staged = model;
        self.pending.clear();
        self.history.clear();
        self.last_verified = position;
        self.desynced = false;
    }

    fn push_history(&mut self, record: OpRecord<M::Action>) {
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

fn apply<M: SimulationModel>(model: &mut M, op: &OpKind<M::Action>) {
    match op {
        OpKind::Action(action) => model.apply_action(action),
        OpKind::Tick => model.advance_tick(),
    }
}
