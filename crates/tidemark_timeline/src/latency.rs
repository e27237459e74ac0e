//! # Latency Probes
//!
//! A probe is a pair of requests sent together: a transport-level
//! `WirePing` and an application-level `TraceQuery`. Both share one id. The
//! sample is only produced once both replies have arrived, in either order.
//!
//! Only one probe is in flight at a time. A probe that never completes is
//! superseded once it is older than the stale window; replies carrying a
//! superseded id are ignored.

/// One completed latency measurement, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatencySample {
    /// Transport round trip (ping → pong).
    pub network_ms: i64,
    /// Application message round trip (trace query → reply).
    pub messaging_ms: i64,
    /// Messaging round trip plus the server's action queue delay.
    pub action_submit_ms: i64,
}

/// What a reply did to the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeReply {
    /// The id is not in flight; the reply was dropped.
    Stale,
    /// Recorded; the other half is still outstanding.
    Pending,
    /// Both halves are in; the probe is finished.
    Complete(LatencySample),
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    id: u32,
    sent_at_ms: i64,
    pong_at_ms: Option<i64>,
    trace: Option<(i64, u32)>,
}

impl InFlight {
    fn sample(&self) -> Option<LatencySample> {
        let pong_at = self.pong_at_ms?;
        let (trace_at, queue_ms) = self.trace?;
        let messaging_ms = trace_at - self.sent_at_ms;
        Some(LatencySample {
            network_ms: pong_at - self.sent_at_ms,
            messaging_ms,
            action_submit_ms: messaging_ms + i64::from(queue_ms),
        })
    }
}

/// Schedules probes and pairs their replies.
#[derive(Clone, Debug, Default)]
pub struct LatencyTracker {
    next_id: u32,
    in_flight: Option<InFlight>,
    last_started_ms: Option<i64>,
    latest: Option<LatencySample>,
}

impl LatencyTracker {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a new probe may start at `now_ms`.
    ///
    /// A probe is due once `interval_ms` has passed since the previous one,
    /// unless a probe is still in flight and younger than `stale_after_ms`.
    #[must_use]
    pub fn is_due(&self, now_ms: i64, interval_ms: i64, stale_after_ms: i64) -> bool {
        if let Some(probe) = &self.in_flight {
            if now_ms - probe.sent_at_ms < stale_after_ms {
                return false;
            }
        }
        self.last_started_ms
            .map_or(true, |last| now_ms - last >= interval_ms)
    }

    /// Starts a probe, superseding any stale one. Returns its id.
    pub fn start(&mut self, now_ms: i64) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        let id = self.next_id;
        if let Some(old) = self.in_flight.replace(InFlight {
            id,
            sent_at_ms: now_ms,
            pong_at_ms: None,
            trace: None,
        }) {
            tracing::debug!(id = old.id, "latency probe superseded");
        }
        self.last_started_ms = Some(now_ms);
        id
    }

    /// Records a wire pong.
    pub fn on_wire_pong(&mut self, id: u32, now_ms: i64) -> ProbeReply {
        match self.probe_mut(id) {
            Some(probe) => {
                probe.pong_at_ms.get_or_insert(now_ms);
            }
            None => return ProbeReply::Stale,
        }
        self.try_complete()
    }

    /// Records a trace reply.
    pub fn on_trace_reply(&mut self, id: u32, action_queue_ms: u32, now_ms: i64) -> ProbeReply {
        match self.probe_mut(id) {
            Some(probe) => {
                probe.trace.get_or_insert((now_ms, action_queue_ms));
            }
            None => return ProbeReply::Stale,
        }
        self.try_complete()
    }

    /// Most recent completed sample.
    #[inline]
    #[must_use]
    pub const fn latest(&self) -> Option<LatencySample> {
        self.latest
    }

    /// Returns true while a probe awaits replies.
    #[inline]
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    fn probe_mut(&mut self, id: u32) -> Option<&mut InFlight> {
        self.in_flight.as_mut().filter(|probe| probe.id == id)
    }

    fn try_complete(&mut self) -> ProbeReply {
        let Some(sample) = self.in_flight.as_ref().and_then(InFlight::sample) else {
            return ProbeReply::Pending;
        };
        self.in_flight = None;
        self.latest = Some(sample);
        ProbeReply::Complete(sample)
    }
}
