//! # Deterministic Simulation Model
//!
//! The journal drives any type implementing [`SimulationModel`]. The contract
//! is determinism: the same starting state plus the same operations must
//! serialize to the same bytes, every time, on every peer.
//!
//! ## Checksums
//!
//! The default digest is CRC-32 (IEEE) over the codec-serialized state.
//! Client and server must agree on it; override [`SimulationModel::checksum`]
//! only together with the server.

use std::fmt;

use tidemark_io::{encode_to_vec, IOWriter};

use crate::position::JournalPosition;

/// A deterministic model advanced by actions and ticks.
pub trait SimulationModel: Clone {
    /// The opaque mutation applied by [`apply_action`](Self::apply_action).
    type Action: Clone + fmt::Debug;

    /// Applies one action. Must advance [`position`](Self::position).
    fn apply_action(&mut self, action: &Self::Action);

    /// Advances time by one tick. Must advance [`position`](Self::position).
    fn advance_tick(&mut self);

    /// How far the model has progressed.
    fn position(&self) -> JournalPosition;

    /// Writes the complete model state in a canonical byte form.
    fn serialize_state(&self, writer: &mut IOWriter<'_>);

    /// Digest of the current state.
    fn checksum(&self) -> u32 {
        state_checksum(self)
    }
}

/// CRC-32 of the model's serialized state.
pub fn state_checksum<M: SimulationModel>(model: &M) -> u32 {
    crc32fast::hash(&state_snapshot(model))
}

/// The model's serialized state.
pub fn state_snapshot<M: SimulationModel>(model: &M) -> Vec<u8> {
    encode_to_vec(|w| model.serialize_state(w))
}
