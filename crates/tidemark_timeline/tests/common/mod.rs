//! Shared test model and a scripted server.

#![allow(dead_code)]

use tidemark_io::{DecodeResult, IOReader, IOWriter};
use tidemark_timeline::{
    DecodeLimits, JournalPosition, ServerMessage, SimulationModel, TimelineUpdateMessage,
    WireAction,
};

/// Actions on the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaAction {
    Deposit { player: u8, amount: i64 },
    Rename(String),
}

impl WireAction for ArenaAction {
    fn encode(&self, writer: &mut IOWriter<'_>) {
        match self {
            Self::Deposit { player, amount } => {
                writer.write_var_uint(0);
                writer.write_u8(*player);
                writer.write_var_long(*amount);
            }
            Self::Rename(label) => {
                writer.write_var_uint(1);
                writer.write_str(label);
            }
        }
    }

    fn decode(reader: &mut IOReader<'_>, limits: &DecodeLimits) -> DecodeResult<Self> {
        match reader.read_var_uint()? {
            0 => Ok(Self::Deposit {
                player: reader.read_u8()?,
                amount: reader.read_var_long()?,
            }),
            1 => Ok(Self::Rename(reader.read_required_string(limits.max_string_bytes)?)),
            tag => Err(tidemark_io::DecodeError::UnknownTag {
                kind: "ArenaAction",
                tag,
            }),
        }
    }
}

/// Four balances that earn interest every tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arena {
    pub position: JournalPosition,
    pub balances: [i64; 4],
    pub label: String,
}

impl SimulationModel for Arena {
    type Action = ArenaAction;

    fn apply_action(&mut self, action: &ArenaAction) {
        match action {
            ArenaAction::Deposit { player, amount } => {
                let slot = usize::from(*player) % self.balances.len();
                self.balances[slot] = self.balances[slot].wrapping_add(*amount);
            }
            ArenaAction::Rename(label) => self.label.clone_from(label),
        }
        self.position = self.position.next_operation();
    }

    fn advance_tick(&mut self) {
        for balance in &mut self.balances {
            *balance += *balance / 100;
        }
        self.position = self.position.next_tick();
    }

    fn position(&self) -> JournalPosition {
        self.position
    }

    fn serialize_state(&self, writer: &mut IOWriter<'_>) {
        self.position.encode(writer);
        for balance in &self.balances {
            writer.write_var_long(*balance);
        }
        writer.write_str(&self.label);
    }
}

/// Authoritative side: applies ops and stamps honest checksums.
#[derive(Default)]
pub struct ServerSim {
    pub model: Arena,
}

impl ServerSim {
    pub fn batch(&mut self, ops: Vec<Option<ArenaAction>>) -> TimelineUpdateMessage<ArenaAction> {
        for op in &ops {
            self.apply(op.as_ref());
        }
        TimelineUpdateMessage {
            ops,
            final_checksum: self.model.checksum(),
            debug_checksums: None,
        }
    }

    pub fn batch_with_debug(
        &mut self,
        ops: Vec<Option<ArenaAction>>,
    ) -> TimelineUpdateMessage<ArenaAction> {
        let mut debug = Vec::with_capacity(ops.len());
        for op in &ops {
            self.apply(op.as_ref());
            debug.push(self.model.checksum());
        }
        TimelineUpdateMessage {
            ops,
            final_checksum: self.model.checksum(),
            debug_checksums: Some(debug),
        }
    }

    fn apply(&mut self, op: Option<&ArenaAction>) {
        match op {
            Some(action) => self.model.apply_action(action),
            None => self.model.advance_tick(),
        }
    }
}

pub fn deposit(player: u8, amount: i64) -> Option<ArenaAction> {
    Some(ArenaAction::Deposit { player, amount })
}

pub fn update(message: TimelineUpdateMessage<ArenaAction>) -> ServerMessage<ArenaAction> {
    ServerMessage::TimelineUpdate(message)
}
