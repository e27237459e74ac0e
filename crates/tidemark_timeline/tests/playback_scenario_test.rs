//! # Playback Scenarios
//!
//! Checksum mismatch reporting, frame-cap throttling and configuration,
//! driven through the public controller API and a channel transport.

mod common;

use common::{deposit, update, Arena, ArenaAction, ServerSim};
use tidemark_timeline::{
    state_snapshot, ChannelPeer, ChannelTransport, ClientMessage, ConfigError, JournalPosition,
    ManualClock, MismatchReport, Pacing, PlaybackConfig, PlaybackController, PlaybackEvent,
    SimulationModel,
};

type Controller = PlaybackController<Arena, ChannelTransport<ArenaAction>, ManualClock>;

fn setup(config: PlaybackConfig) -> (Controller, ChannelPeer<ArenaAction>) {
    let (transport, peer) = ChannelTransport::pair(config.decode_limits());
    let controller =
        PlaybackController::new(Arena::default(), transport, ManualClock::new(0), config).unwrap();
    (controller, peer)
}

fn mismatch_reports(peer: &ChannelPeer<ArenaAction>) -> Vec<MismatchReport<ArenaAction>> {
    peer.drain()
        .into_iter()
        .filter_map(|message| match message {
            ClientMessage::ChecksumMismatch(report) => Some(report),
            _ => None,
        })
        .collect()
}

#[test]
fn test_mismatch_on_tick_reports_once() {
    let (mut controller, peer) = setup(PlaybackConfig::default());
    let mut server = ServerSim::default();

    let mut batch = server.batch(vec![deposit(0, 100), deposit(1, 50), deposit(0, -20), None]);
    let declared = batch.final_checksum ^ 1;
    batch.final_checksum = declared;
    peer.send(&update(batch));

    let report = controller.update_at(0);
    assert!(report.conflict);
    assert_eq!(report.actions_processed, 3);
    assert_eq!(report.ticks_processed, 1);
    assert_eq!(report.committed, Some(JournalPosition::new(1, 0, 0)));

    let reports = mismatch_reports(&peer);
    assert_eq!(reports.len(), 1);
    let sent = &reports[0];
    assert_eq!(sent.position, JournalPosition::new(1, 0, 0));
    assert_eq!(sent.expected, declared);
    assert_eq!(sent.actual, server.model.checksum());
    assert_eq!(sent.ops.len(), 4);
    assert_eq!(sent.snapshot, state_snapshot(&server.model));

    let conflicts = controller
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, PlaybackEvent::ChecksumMismatch(_)))
        .count();
    assert_eq!(conflicts, 1);
    assert!(controller.journal().is_desynced());

    // A second divergence is surfaced locally but not re-reported upstream.
    let mut batch = server.batch(vec![None]);
    batch.final_checksum ^= 1;
    peer.send(&update(batch));
    let report = controller.update_at(100);
    assert!(report.conflict);
    assert!(mismatch_reports(&peer).is_empty());
    assert_eq!(controller.journal().conflict_count(), 2);
}

#[test]
fn test_resync_clears_desync() {
    let (mut controller, peer) = setup(PlaybackConfig::default());
    let mut server = ServerSim::default();

    let mut batch = server.batch(vec![deposit(2, 10), None]);
    batch.final_checksum = batch.final_checksum.wrapping_add(1);
    peer.send(&update(batch));
    assert!(controller.update_at(0).conflict);

    controller.resync(server.model.clone());
    assert!(!controller.journal().is_desynced());

    peer.send(&update(server.batch(vec![deposit(3, 7), None])));
    let report = controller.update_at(500);
    assert!(!report.conflict);
    assert_eq!(report.committed, Some(JournalPosition::new(2, 0, 0)));
    assert_eq!(controller.journal().committed_model(), &server.model);
}

#[test]
fn test_debug_checksums_pinpoint_action() {
    let config = PlaybackConfig {
        enhanced_debug: true,
        ..PlaybackConfig::default()
    };
    let (mut controller, peer) = setup(config);
    let mut server = ServerSim::default();

    let mut batch = server.batch_with_debug(vec![deposit(0, 5), deposit(0, 6), None]);
    if let Some(list) = batch.debug_checksums.as_mut() {
        list[1] ^= 0xFF;
    }
    peer.send(&update(batch));
    controller.update_at(0);

    let reports = mismatch_reports(&peer);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].position, JournalPosition::new(0, 2, 0));
    // The first deposit verified; only the second is implicated.
    assert_eq!(reports[0].ops.len(), 1);
}

#[test]
fn test_backlog_is_capped_per_frame() {
    let config = PlaybackConfig {
        ticks_per_second: 30,
        ..PlaybackConfig::default()
    };
    let (mut controller, _peer) = setup(config);
    let mut server = ServerSim::default();
    // Received at time 0, played back long after.
    controller.handle_message(update(server.batch(vec![deposit(1, 1_000)])));
    controller.handle_message(update(server.batch(vec![None; 100])));

    let mut processed = Vec::new();
    let mut throttled = Vec::new();
    for frame in 0..5 {
        let report = controller.update_at(100_000 + frame);
        processed.push(report.ticks_processed);
        throttled.push(report.throttled);
    }
    assert_eq!(processed, vec![30, 30, 30, 10, 0]);
    assert_eq!(throttled, vec![true, true, true, false, false]);
    assert!(!controller.journal().is_desynced());
    assert_eq!(controller.journal().committed_model(), &server.model);
}

#[test]
fn test_config_from_toml() {
    let config = PlaybackConfig::from_toml_str(
        r#"
        ticks_per_second = 20
        pacing = "instant"
        max_buffer_ms = 250
        journal_history = 32
        "#,
    )
    .unwrap();
    assert_eq!(config.pacing, Pacing::Instant);
    assert_eq!(config.tick_cap(), 20);
    assert_eq!(config.jitter_capacity(), 100);
    assert_eq!(config.decode_limits().max_ops, 4_096);

    let (controller, _peer) = setup(config);
    assert_eq!(controller.config().max_buffer_ms, 250);
}

#[test]
fn test_invalid_config_rejected() {
    let (transport, _peer) = ChannelTransport::<ArenaAction>::pair(Default::default());
    let config = PlaybackConfig {
        probe_interval_ms: 0,
        ..PlaybackConfig::default()
    };
    let result = PlaybackController::new(Arena::default(), transport, ManualClock::new(0), config);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
