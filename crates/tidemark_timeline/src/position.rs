//! # Journal Positions
//!
//! How far a model has progressed, as `(tick, operation, step)`.
//!
//! ```text
//! (4, 0, 0) ─ action ─► (4, 1, 0) ─ action ─► (4, 2, 0) ─ tick ─► (5, 0, 0)
//! ```
//!
//! Ordering is lexicographic over the triple.

use std::fmt;

use tidemark_io::{DecodeResult, IOReader, IOWriter};

/// A point in a model's history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JournalPosition {
    /// Completed ticks.
    pub tick: i64,
    /// Operations applied since the last tick.
    pub operation: i32,
    /// Sub-steps applied within the current operation.
    pub step: i32,
}

impl JournalPosition {
    /// The origin.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates a position.
    #[inline]
    #[must_use]
    pub const fn new(tick: i64, operation: i32, step: i32) -> Self {
        Self {
            tick,
            operation,
            step,
        }
    }

    /// Position after one more operation in the same tick.
    #[inline]
    #[must_use]
    pub const fn next_operation(self) -> Self {
        Self::new(self.tick, self.operation + 1, 0)
    }

    /// Position after the next tick boundary.
    #[inline]
    #[must_use]
    pub const fn next_tick(self) -> Self {
        Self::new(self.tick + 1, 0, 0)
    }

    /// Position after one more sub-step of the current operation.
    #[inline]
    #[must_use]
    pub const fn next_step(self) -> Self {
        Self::new(self.tick, self.operation, self.step + 1)
    }

    /// Writes the position as three signed var-ints.
    pub fn encode(&self, writer: &mut IOWriter<'_>) {
        writer.write_var_long(self.tick);
        writer.write_var_int(self.operation);
        writer.write_var_int(self.step);
    }

    /// Reads a position written by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Propagates codec errors.
    pub fn decode(reader: &mut IOReader<'_>) -> DecodeResult<Self> {
        Ok(Self::new(
            reader.read_var_long()?,
            reader.read_var_int()?,
            reader.read_var_int()?,
        ))
    }
}

impl fmt::Display for JournalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tick, self.operation, self.step)
    }
}
