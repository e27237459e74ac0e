//! # Arrival Jitter History
//!
//! For every timeline update we predict when the next one should arrive
//! (this arrival + the model time it covers) and record how early or late it
//! actually was.
//!
//! ```text
//! sample = expected - actual      (negative = late)
//! expected_next = actual + model_ms_in_message
//! ```
//!
//! The prediction is re-anchored on every arrival, so a delay shows up as one
//! sample and leaves with it once the window rolls past. The most negative
//! sample in the window is the buffer smooth pacing needs.

use std::collections::VecDeque;

/// Bounded window of arrival-timing samples.
#[derive(Clone, Debug)]
pub struct ArrivalHistory {
    samples: VecDeque<i64>,
    capacity: usize,
    expected_next_ms: Option<i64>,
}

impl ArrivalHistory {
    /// Creates a history keeping at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            expected_next_ms: None,
        }
    }

    /// Records an arrival at `now_ms` of a message covering `advance_ms` of
    /// model time. Returns the sample.
    pub fn record(&mut self, now_ms: i64, advance_ms: i64) -> i64 {
        let sample = self.expected_next_ms.map_or(0, |expected| expected - now_ms);
        self.expected_next_ms = Some(now_ms + advance_ms);
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        sample
    }

    /// Most negative (latest) sample in the window, or 0 when empty.
    #[must_use]
    pub fn worst_sample(&self) -> i64 {
        self.samples.iter().copied().min().unwrap_or(0).min(0)
    }

    /// Buffer needed to absorb the worst lateness, clamped to `[0, max_ms]`.
    #[must_use]
    pub fn required_buffer_ms(&self, max_ms: i64) -> i64 {
        (-self.worst_sample()).clamp(0, max_ms.max(0))
    }

    /// When the next message is predicted to arrive.
    #[inline]
    #[must_use]
    pub const fn expected_next_ms(&self) -> Option<i64> {
        self.expected_next_ms
    }

    /// Number of samples held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true before the first arrival.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
