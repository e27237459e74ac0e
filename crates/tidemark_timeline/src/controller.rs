//! # Playback Controller
//!
//! Plays a server timeline into a local [`ModelJournal`] at a pace that
//! hides network jitter.
//!
//! ## Time
//!
//! ```text
//! presentation time = model time + delta
//!
//!   model:   tick 1   tick 2   tick 3   tick 4
//!              │        │        │        │
//!   wall:  ────┼────────┼────────┼────────┼────►
//!              ▲ tick_time(1) + delta
//! ```
//!
//! A tick is played once the wall clock reaches its presentation time.
//! Actions have no timing gate; they play as soon as the tick before them has.
//!
//! ## One update
//!
//! 1. Flush queued local actions
//! 2. Maybe start a latency probe
//! 3. Extract due ops (ticks capped per frame)
//! 4. Stage up to the last op carrying a checksum, commit, stage the rest
//! 5. Pacing: stall, catch up, or hold (skipped when throttled)
//! 6. Recompute the interpolation ratio
//!
//! Not thread-safe and not re-entrant: call from one update loop.

use std::collections::VecDeque;

use crate::clock::Clock;
use crate::config::{Pacing, PlaybackConfig};
use crate::error::ConfigError;
use crate::events::PlaybackEvent;
use crate::jitter::ArrivalHistory;
use crate::journal::{CommitOutcome, ModelJournal};
use crate::latency::{LatencySample, LatencyTracker, ProbeReply};
use crate::messages::{ClientMessage, MismatchReport, ServerMessage, WireAction};
use crate::model::SimulationModel;
use crate::ops::{PlaybackOp, TimelineUpdateMessage};
use crate::position::JournalPosition;
use crate::transport::Transport;

/// Lifecycle of the channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelState {
    /// Receiving and playing.
    #[default]
    Active,
    /// Connection lost. Terminal.
    Disconnected,
}

/// What one [`PlaybackController::update`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateReport {
    /// Ticks staged this frame.
    pub ticks_processed: u32,
    /// Actions staged this frame.
    pub actions_processed: u32,
    /// The per-frame tick cap was hit; pacing was skipped.
    pub throttled: bool,
    /// Committed position after this frame's commit, if one happened.
    pub committed: Option<JournalPosition>,
    /// The commit found a checksum mismatch.
    pub conflict: bool,
    /// Sub-tick interpolation ratio in `[0, 1]`.
    pub interpolation: f64,
    /// Channel state after the update.
    pub state: ChannelState,
}

/// Drives a model journal from a server timeline.
pub struct PlaybackController<M, T, C>
where
    M: SimulationModel,
{
    config: PlaybackConfig,
    journal: ModelJournal<M>,
    transport: T,
    clock: C,
    state: ChannelState,

    /// Received ops not yet played.
    incoming: VecDeque<PlaybackOp<M::Action>>,
    /// Local actions waiting for the next flush.
    outgoing_actions: Vec<M::Action>,
    events: Vec<PlaybackEvent<M::Action>>,

    arrival: ArrivalHistory,
    latency: LatencyTracker,

    /// Presentation time minus model time. Unknown until the first tick.
    delta_ms: Option<i64>,
    presented_tick: i64,
    latest_received_tick: i64,
    buffered_ticks: usize,

    stalled_since_ms: Option<i64>,
    fast_forwarding: bool,
    /// Sub-millisecond remainder of gradual catch-up.
    catch_up_carry: f64,
    last_update_ms: Option<i64>,
    interpolation: f64,
}

impl<M, T, C> PlaybackController<M, T, C>
where
    M: SimulationModel,
    M::Action: WireAction,
    T: Transport<M::Action>,
    C: Clock,
{
    /// Creates a controller playing onto `model`.
    ///
    /// # Errors
    ///
    /// Returns the validation error of `config`.
    pub fn new(
        model: M,
        transport: T,
        clock: C,
        config: PlaybackConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tick = model.position().tick;
        Ok(Self {
            journal: ModelJournal::new(model, config.journal_history),
            arrival: ArrivalHistory::new(config.jitter_capacity()),
            config,
            transport,
            clock,
            state: ChannelState::Active,
            incoming: VecDeque::new(),
            outgoing_actions: Vec::new(),
            events: Vec::new(),
            latency: LatencyTracker::new(),
            delta_ms: None,
            presented_tick: tick,
            latest_received_tick: tick,
            buffered_ticks: 0,
            stalled_since_ms: None,
            fast_forwarding: false,
            catch_up_carry: 0.0,
            last_update_ms: None,
            interpolation: 0.0,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Channel state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    /// The journal being played into.
    #[inline]
    #[must_use]
    pub const fn journal(&self) -> &ModelJournal<M> {
        &self.journal
    }

    /// The configuration in use.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// The transport.
    #[inline]
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Presentation time minus model time, once known.
    #[inline]
    #[must_use]
    pub const fn presentation_delta_ms(&self) -> Option<i64> {
        self.delta_ms
    }

    /// Sub-tick interpolation ratio computed by the last update.
    #[inline]
    #[must_use]
    pub const fn interpolation(&self) -> f64 {
        self.interpolation
    }

    /// Received ticks not yet played.
    #[inline]
    #[must_use]
    pub const fn buffered_ticks(&self) -> usize {
        self.buffered_ticks
    }

    /// Last played tick.
    #[inline]
    #[must_use]
    pub const fn presented_tick(&self) -> i64 {
        self.presented_tick
    }

    /// Newest tick received from the server.
    #[inline]
    #[must_use]
    pub const fn latest_received_tick(&self) -> i64 {
        self.latest_received_tick
    }

    /// Returns true while playback waits for ticks.
    #[inline]
    #[must_use]
    pub const fn is_stalled(&self) -> bool {
        self.stalled_since_ms.is_some()
    }

    /// Returns true while gradual catch-up is running.
    #[inline]
    #[must_use]
    pub const fn is_fast_forwarding(&self) -> bool {
        self.fast_forwarding
    }

    /// Most recent completed latency probe.
    #[inline]
    #[must_use]
    pub const fn latest_latency(&self) -> Option<LatencySample> {
        self.latency.latest()
    }

    /// Takes every event queued since the last call.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent<M::Action>> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Queues a local action for the next update's flush.
    pub fn enqueue_local_action(&mut self, action: M::Action) {
        if self.state == ChannelState::Active {
            self.outgoing_actions.push(action);
        }
    }

    /// Feeds one server message, stamped with the controller clock.
    pub fn handle_message(&mut self, message: ServerMessage<M::Action>) {
        let now = self.clock.now_ms();
        self.receive(message, now);
    }

    /// Irrecoverable connection loss. Stops all further playback.
    pub fn on_connection_lost(&mut self) {
        if self.state == ChannelState::Disconnected {
            return;
        }
        tracing::info!(
            presented_tick = self.presented_tick,
            buffered_ticks = self.buffered_ticks,
            "playback channel disconnected"
        );
        self.state = ChannelState::Disconnected;
        self.incoming.clear();
        self.outgoing_actions.clear();
        self.buffered_ticks = 0;
        self.events.push(PlaybackEvent::Disconnected);
    }

    /// Replaces the local model with an authoritative one, dropping every
    /// buffered op.
    pub fn resync(&mut self, model: M) {
        let tick = model.position().tick;
        self.journal.reset(model);
        self.incoming.clear();
        self.buffered_ticks = 0;
        self.presented_tick = tick;
        self.latest_received_tick = tick;
        self.delta_ms = None;
        self.stalled_since_ms = None;
        self.fast_forwarding = false;
        self.catch_up_carry = 0.0;
    }

    fn receive(&mut self, message: ServerMessage<M::Action>, now: i64) {
        if self.state == ChannelState::Disconnected {
            return;
        }
        match message {
            ServerMessage::TimelineUpdate(update) => self.receive_timeline(update, now),
            ServerMessage::WirePong { id } => {
                let reply = self.latency.on_wire_pong(id, now);
                self.on_probe_reply(id, reply);
            }
            ServerMessage::TraceReply {
                id,
                action_queue_ms,
            } => {
                let reply = self.latency.on_trace_reply(id, action_queue_ms, now);
                self.on_probe_reply(id, reply);
            }
        }
    }

    fn receive_timeline(&mut self, update: TimelineUpdateMessage<M::Action>, now: i64) {
        let ticks = update.tick_count();
        let first_tick = self.latest_received_tick;
        let last_tick = first_tick + ticks as i64;
        self.arrival
            .record(now, self.config.tick_time(last_tick) - self.config.tick_time(first_tick));

        let ops = update.into_playback_ops(self.config.enhanced_debug);
        tracing::debug!(ops = ops.len(), ticks, last_tick, "timeline update received");
        self.incoming.extend(ops);
        self.latest_received_tick = last_tick;
        self.buffered_ticks += ticks;

        if self.delta_ms.is_none() && ticks > 0 {
            self.delta_ms = Some(now - self.config.tick_time(self.presented_tick + 1));
        }
    }

    fn on_probe_reply(&mut self, id: u32, reply: ProbeReply) {
        match reply {
            ProbeReply::Complete(sample) => {
                tracing::debug!(
                    id,
                    network_ms = sample.network_ms,
                    messaging_ms = sample.messaging_ms,
                    action_submit_ms = sample.action_submit_ms,
                    "latency probe complete"
                );
                self.events.push(PlaybackEvent::LatencyMeasured(sample));
            }
            ProbeReply::Pending => {}
            ProbeReply::Stale => tracing::warn!(id, "ignoring stale probe reply"),
        }
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Runs one frame at the clock's current time.
    pub fn update(&mut self) -> UpdateReport {
        let now = self.clock.now_ms();
        self.update_at(now)
    }

    /// Runs one frame at presentation time `now`.
    pub fn update_at(&mut self, now: i64) -> UpdateReport {
        let mut report = UpdateReport {
            ticks_processed: 0,
            actions_processed: 0,
            throttled: false,
            committed: None,
            conflict: false,
            interpolation: self.interpolation,
            state: self.state,
        };
        if self.state == ChannelState::Disconnected {
            return report;
        }

        while let Some(message) = self.transport.try_recv() {
            self.receive(message, now);
        }
        if !self.transport.is_connected() {
            self.on_connection_lost();
            report.state = self.state;
            return report;
        }

        let elapsed = self.last_update_ms.map_or(0, |last| (now - last).max(0));
        self.last_update_ms = Some(now);

        // 1. Flush local actions.
        let sending = !self.outgoing_actions.is_empty();
        if sending {
            let actions = std::mem::take(&mut self.outgoing_actions);
            tracing::debug!(count = actions.len(), "flushing local actions");
            self.transport.send(ClientMessage::EnqueueActions { actions });
        }

        // 2. Latency probe.
        let interval = if sending {
            self.config.accelerated_probe_interval_ms
        } else {
            self.config.probe_interval_ms
        };
        if self.latency.is_due(now, interval, self.config.probe_interval_ms) {
            let id = self.latency.start(now);
            tracing::debug!(id, "latency probe started");
            self.transport.send(ClientMessage::WirePing { id });
            self.transport.send(ClientMessage::TraceQuery { id });
        }

        // 3. Extract.
        let first_tick = self.presented_tick + 1;
        let (batch, throttled) = self.extract_due(now);
        report.throttled = throttled;
        if self.presented_tick >= first_tick {
            if let Some(since) = self.stalled_since_ms.take() {
                tracing::info!(tick = first_tick, stalled_ms = now - since, "playback stall ended");
                self.events.push(PlaybackEvent::StallEnded {
                    tick: first_tick,
                    stalled_ms: now - since,
                });
            }
        }

        // 4. Stage and commit.
        if !self.play(batch, &mut report) {
            return report;
        }

        // 5. Pacing.
        if !throttled {
            self.pace(now, elapsed);
        }

        // 6. Interpolation.
        self.interpolation = self.delta_ms.map_or(0.0, |delta| {
            let since_tick = now - (self.config.tick_time(self.presented_tick) + delta);
            (since_tick as f64 / self.config.tick_interval_ms()).clamp(0.0, 1.0)
        });
        report.interpolation = self.interpolation;
        report
    }

    /// Pops every due op. Returns the batch and whether the tick cap was hit.
    fn extract_due(&mut self, now: i64) -> (Vec<PlaybackOp<M::Action>>, bool) {
        let cap = self.config.tick_cap();
        let mut ticks = 0;
        let mut batch = Vec::new();
        while let Some(op) = self.incoming.front() {
            if op.is_tick() {
                let Some(delta) = self.delta_ms else { break };
                if now < self.config.tick_time(self.presented_tick + 1) + delta {
                    break;
                }
                if ticks == cap {
                    return (batch, true);
                }
                ticks += 1;
                self.presented_tick += 1;
                self.buffered_ticks = self.buffered_ticks.saturating_sub(1);
            }
            if let Some(op) = self.incoming.pop_front() {
                batch.push(op);
            }
        }
        (batch, false)
    }

    /// Stages the batch, committing at its last checksum. Returns false if
    /// the commit conflicted and playback halted for this frame.
    fn play(&mut self, mut batch: Vec<PlaybackOp<M::Action>>, report: &mut UpdateReport) -> bool {
        let Some(commit_point) = batch.iter().rposition(PlaybackOp::has_checksum) else {
            for op in batch {
                self.stage(op, report);
            }
            return true;
        };
        let rest = batch.split_off(commit_point + 1);
        for op in batch {
            self.stage(op, report);
        }

        let was_desynced = self.journal.is_desynced();
        match self.journal.commit_all() {
            Ok(CommitOutcome::Committed { position, .. }) => report.committed = Some(position),
            Ok(CommitOutcome::Conflict(conflict)) => {
                report.committed = Some(conflict.range_end);
                report.conflict = true;
                if !was_desynced {
                    self.transport
                        .send(ClientMessage::ChecksumMismatch(MismatchReport::from(&conflict)));
                }
                self.events.push(PlaybackEvent::ChecksumMismatch(conflict));
                self.requeue(rest);
                return false;
            }
            Err(error) => tracing::error!(%error, "commit rejected"),
        }

        for op in rest {
            self.stage(op, report);
        }
        true
    }

    fn stage(&mut self, op: PlaybackOp<M::Action>, report: &mut UpdateReport) {
        if op.is_tick() {
            report.ticks_processed += 1;
        } else {
            report.actions_processed += 1;
        }
        self.journal.stage(op);
    }

    /// Returns extracted but unplayed ops to the front of the queue.
    fn requeue(&mut self, rest: Vec<PlaybackOp<M::Action>>) {
        for op in rest.into_iter().rev() {
            if op.is_tick() {
                self.presented_tick -= 1;
                self.buffered_ticks += 1;
            }
            self.incoming.push_front(op);
        }
    }

    fn pace(&mut self, now: i64, elapsed: i64) {
        let Some(delta) = self.delta_ms else {
            return;
        };
        let next_tick_time = self.config.tick_time(self.presented_tick + 1);

        if self.buffered_ticks == 0 && now >= next_tick_time + delta {
            self.delta_ms = Some(now - next_tick_time);
            if self.stalled_since_ms.is_none() {
                tracing::info!(tick = self.presented_tick, "playback stalled");
                self.stalled_since_ms = Some(now);
                self.events.push(PlaybackEvent::StallStarted {
                    tick: self.presented_tick,
                });
            }
            self.end_fast_forward();
            return;
        }

        match self.config.pacing {
            Pacing::Instant => {
                if self.buffered_ticks > 0 {
                    self.delta_ms = Some(now - self.config.tick_time(self.latest_received_tick));
                }
            }
            Pacing::Smooth => self.pace_smooth(now, elapsed, delta),
        }
    }

    fn pace_smooth(&mut self, now: i64, elapsed: i64, delta: i64) {
        let required = self.arrival.required_buffer_ms(self.config.max_buffer_ms);
        let held = self.config.tick_time(self.latest_received_tick) + delta - now;
        let excess = held - required;

        if excess > self.config.immediate_catch_up_ms {
            tracing::debug!(excess_ms = excess, "immediate catch-up");
            self.delta_ms = Some(delta - excess);
            self.catch_up_carry = 0.0;
        } else if excess > 0 {
            let budget = elapsed as f64 * self.config.max_catch_up_speedup + self.catch_up_carry;
            let whole = budget.floor();
            self.catch_up_carry = budget - whole;
            let step = (whole as i64).min(excess);
            if step == 0 {
                return;
            }
            self.delta_ms = Some(delta - step);
            if !self.fast_forwarding {
                tracing::info!(excess_ms = excess, required_ms = required, "fast-forward started");
                self.fast_forwarding = true;
                self.events.push(PlaybackEvent::FastForwardStarted { excess_ms: excess });
            }
        } else {
            self.catch_up_carry = 0.0;
            self.end_fast_forward();
        }
    }

    fn end_fast_forward(&mut self) {
        if self.fast_forwarding {
            tracing::info!("fast-forward ended");
            self.fast_forwarding = false;
            self.events.push(PlaybackEvent::FastForwardEnded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::messages::DecodeLimits;
    use crate::transport::{ChannelPeer, ChannelTransport};
    use tidemark_io::IOWriter;

    #[derive(Clone, Debug, Default)]
    struct Tally {
        position: JournalPosition,
        sum: u32,
    }

    impl SimulationModel for Tally {
        type Action = u32;

        fn apply_action(&mut self, action: &u32) {
            self.sum = self.sum.wrapping_add(*action);
            self.position = self.position.next_operation();
        }

        fn advance_tick(&mut self) {
            self.position = self.position.next_tick();
        }

        fn position(&self) -> JournalPosition {
            self.position
        }

        fn serialize_state(&self, writer: &mut IOWriter<'_>) {
            self.position.encode(writer);
            writer.write_u32(self.sum);
        }
    }

    type Controller = PlaybackController<Tally, ChannelTransport<u32>, ManualClock>;

    fn setup(config: PlaybackConfig) -> (Controller, ChannelPeer<u32>, ManualClock) {
        let (transport, peer) = ChannelTransport::pair(DecodeLimits::default());
        let clock = ManualClock::new(0);
        let controller =
            PlaybackController::new(Tally::default(), transport, clock.clone(), config).unwrap();
        (controller, peer, clock)
    }

    /// `count` ticks after tick `from`, with the honest final checksum.
    fn ticks(from: i64, count: usize) -> ServerMessage<u32> {
        let end = Tally {
            position: JournalPosition::new(from + count as i64, 0, 0),
            sum: 0,
        };
        ServerMessage::TimelineUpdate(TimelineUpdateMessage {
            ops: vec![None; count],
            final_checksum: end.checksum(),
            debug_checksums: None,
        })
    }

    fn unchecked(ops: Vec<Option<u32>>) -> Vec<PlaybackOp<u32>> {
        ops.into_iter()
            .map(|op| op.map_or_else(PlaybackOp::tick, PlaybackOp::action))
            .collect()
    }

    #[test]
    fn test_ticks_wait_for_presentation_time() {
        let (mut controller, _peer, _clock) = setup(PlaybackConfig::default());
        controller.incoming.extend(unchecked(vec![None, None, None]));
        controller.buffered_ticks = 3;
        controller.latest_received_tick = 3;
        controller.delta_ms = Some(900);

        let report = controller.update_at(1_000);
        assert_eq!(report.ticks_processed, 1);
        assert_eq!(controller.presented_tick(), 1);
        let report = controller.update_at(1_150);
        assert_eq!(report.ticks_processed, 1);
        assert_eq!(controller.buffered_ticks(), 1);
    }

    #[test]
    fn test_actions_drain_without_timing_gate() {
        let (mut controller, _peer, _clock) = setup(PlaybackConfig::default());
        controller.incoming.extend(unchecked(vec![Some(1), Some(2), None, Some(3)]));
        controller.buffered_ticks = 1;
        controller.latest_received_tick = 1;
        controller.delta_ms = Some(10_000);

        let report = controller.update_at(0);
        assert_eq!(report.actions_processed, 2);
        assert_eq!(report.ticks_processed, 0);
        assert_eq!(controller.journal().staged_model().sum, 3);
    }

    #[test]
    fn test_frame_cap_throttles() {
        let (mut controller, _peer, _clock) = setup(PlaybackConfig::default());
        controller.handle_message(ticks(0, 40));
        let report = controller.update_at(10_000);
        assert_eq!(report.ticks_processed, 10);
        assert!(report.throttled);
        assert_eq!(controller.buffered_ticks(), 30);
    }

    #[test]
    fn test_stall_events_fire_once() {
        let (mut controller, _peer, _clock) = setup(PlaybackConfig::default());
        controller.handle_message(ticks(0, 1));
        controller.update_at(0);
        assert_eq!(controller.presented_tick(), 1);

        controller.update_at(150);
        controller.update_at(200);
        controller.update_at(300);
        assert!(controller.is_stalled());
        let stalls = controller
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, PlaybackEvent::StallStarted { .. }))
            .count();
        assert_eq!(stalls, 1);

        controller.handle_message(ticks(1, 1));
        controller.update_at(320);
        assert!(!controller.is_stalled());
        assert!(controller
            .drain_events()
            .iter()
            .any(|event| matches!(event, PlaybackEvent::StallEnded { tick: 2, .. })));
    }

    #[test]
    fn test_instant_pacing_jumps_to_latest() {
        let config = PlaybackConfig {
            pacing: Pacing::Instant,
            ..PlaybackConfig::default()
        };
        let (mut controller, _peer, _clock) = setup(config);
        controller.handle_message(ticks(0, 5));
        controller.update_at(0);
        // Tick 5 is now due at the current time.
        assert_eq!(controller.presentation_delta_ms(), Some(-500));
        let report = controller.update_at(1);
        assert_eq!(report.ticks_processed, 4);
    }

    #[test]
    fn test_smooth_pacing_catches_up_gradually() {
        let (mut controller, _peer, _clock) = setup(PlaybackConfig::default());
        controller.handle_message(ticks(0, 6));
        controller.update_at(0);
        // 500ms of buffer held, none required.
        let before = controller.presentation_delta_ms().unwrap();
        controller.update_at(50);
        let after = controller.presentation_delta_ms().unwrap();
        assert_eq!(before - after, 10);
        assert!(controller.is_fast_forwarding());
        assert!(controller
            .drain_events()
            .iter()
            .any(|event| matches!(event, PlaybackEvent::FastForwardStarted { .. })));
    }

    #[test]
    fn test_fast_forward_waits_for_first_step() {
        let (mut controller, _peer, _clock) = setup(PlaybackConfig::default());
        controller.handle_message(ticks(0, 6));
        let delta = controller.presentation_delta_ms();
        // First frame: no elapsed time, so delta cannot move.
        controller.update_at(0);
        assert_eq!(controller.presentation_delta_ms(), delta);
        assert!(!controller.is_fast_forwarding());
        assert!(!controller
            .drain_events()
            .iter()
            .any(|event| matches!(event, PlaybackEvent::FastForwardStarted { .. })));

        // 4ms at 20% rounds down to nothing.
        controller.update_at(4);
        assert!(!controller.is_fast_forwarding());
        controller.update_at(10);
        assert!(controller.is_fast_forwarding());
    }

    #[test]
    fn test_single_delay_leaves_arrival_window() {
        let config = PlaybackConfig::default();
        let window = config.jitter_capacity();
        let max_buffer = config.max_buffer_ms;
        let (mut controller, _peer, clock) = setup(config);

        // One update per tick; update 20 arrives 300ms late and the server
        // stays on the shifted cadence afterwards.
        let arrival = |index: i64| if index < 20 { index * 100 } else { index * 100 + 300 };
        for index in 0..20 {
            clock.set(arrival(index));
            controller.handle_message(ticks(index, 1));
        }
        assert_eq!(controller.arrival.required_buffer_ms(max_buffer), 0);

        clock.set(arrival(20));
        controller.handle_message(ticks(20, 1));
        assert_eq!(controller.arrival.required_buffer_ms(max_buffer), 300);

        let steady = 21 + window as i64;
        for index in 21..steady {
            clock.set(arrival(index));
            controller.handle_message(ticks(index, 1));
        }
        assert_eq!(controller.arrival.required_buffer_ms(max_buffer), 0);
    }

    #[test]
    fn test_smooth_pacing_immediate_catch_up() {
        let (mut controller, _peer, _clock) = setup(PlaybackConfig::default());
        controller.handle_message(ticks(0, 30));
        controller.update_at(0);
        assert_eq!(controller.presented_tick(), 1);
        // 2900ms held is beyond the immediate threshold: tick 30 is due now.
        assert_eq!(controller.presentation_delta_ms(), Some(-3_000));
        assert!(!controller.is_fast_forwarding());
    }

    #[test]
    fn test_interpolation_ratio() {
        let (mut controller, _peer, _clock) = setup(PlaybackConfig::default());
        controller.incoming.extend(unchecked(vec![None, None, None]));
        controller.buffered_ticks = 3;
        controller.latest_received_tick = 3;
        controller.delta_ms = Some(0);

        let report = controller.update_at(150);
        assert_eq!(controller.presented_tick(), 1);
        assert!((report.interpolation - 0.5).abs() < 1e-9);
        assert!((controller.interpolation() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_local_actions_flushed_with_probe() {
        let (mut controller, peer, _clock) = setup(PlaybackConfig::default());
        controller.enqueue_local_action(4);
        controller.enqueue_local_action(5);
        controller.update_at(0);
        let sent = peer.drain();
        assert_eq!(sent[0], ClientMessage::EnqueueActions { actions: vec![4, 5] });
        assert!(sent.contains(&ClientMessage::WirePing { id: 1 }));
        assert!(sent.contains(&ClientMessage::TraceQuery { id: 1 }));

        controller.update_at(10);
        assert!(peer.drain().is_empty());
    }

    #[test]
    fn test_latency_event() {
        let (mut controller, peer, clock) = setup(PlaybackConfig::default());
        controller.update_at(0);
        clock.set(40);
        peer.send(&ServerMessage::WirePong { id: 1 });
        peer.send(&ServerMessage::TraceReply {
            id: 1,
            action_queue_ms: 25,
        });
        controller.update();
        assert_eq!(
            controller.latest_latency(),
            Some(LatencySample {
                network_ms: 40,
                messaging_ms: 40,
                action_submit_ms: 65,
            })
        );
    }

    #[test]
    fn test_disconnect_is_terminal() {
        let (mut controller, peer, _clock) = setup(PlaybackConfig::default());
        drop(peer);
        let report = controller.update_at(0);
        assert_eq!(report.state, ChannelState::Disconnected);
        assert_eq!(controller.drain_events(), vec![PlaybackEvent::Disconnected]);

        controller.handle_message(ticks(0, 3));
        let report = controller.update_at(1_000);
        assert_eq!(report.ticks_processed, 0);
        assert_eq!(controller.buffered_ticks(), 0);
    }
}
