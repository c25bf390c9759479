//! Gapless preloader integration tests

mod helpers;

use helpers::{start_player, track_ids};
use segue_common::events::PlayerEvent;
use segue_common::params::PlayerPrefs;
use segue_player::playback::queue::QueuePosition;
use std::time::Duration;
use tokio::time::sleep;

fn gapless_prefs() -> PlayerPrefs {
    PlayerPrefs {
        gapless_enabled: true,
        crossfade_enabled: false,
        ..Default::default()
    }
}

/// The next track is preloaded inside the 4s window and the natural end
/// hard-switches to it: clock at zero, playing, and resolved exactly once
/// (no intermediate ended → next() resolution).
#[tokio::test(start_paused = true)]
async fn preload_and_hard_switch_at_track_end() {
    let tracks = track_ids(2);
    let player = start_player(&[(tracks[0], 10_000), (tracks[1], 8_000)]).await;
    player.engine.apply_settings(gapless_prefs()).await.unwrap();

    let mut events = player.engine.subscribe_events();
    player
        .engine
        .play_track(tracks[0], Some(tracks.clone()))
        .await
        .unwrap();

    // Outside the window: nothing preloaded yet
    sleep(Duration::from_millis(5_500)).await;
    let diag = player.engine.lane_diagnostics().await;
    assert!(diag.lanes.iter().all(|l| l.track_id != Some(tracks[1])));

    // Inside the window: the idle lane holds the next track, not started
    sleep(Duration::from_millis(1_000)).await;
    let diag = player.engine.lane_diagnostics().await;
    let preloaded = diag
        .lanes
        .iter()
        .find(|l| l.track_id == Some(tracks[1]))
        .expect("next track preloaded in idle lane");
    assert!(!preloaded.playing);
    assert_ne!(preloaded.key, diag.active);

    // Just past the end: hard switch, no fade
    sleep(Duration::from_millis(3_600)).await;
    let snapshot = player.engine.snapshot().await;
    assert_eq!(snapshot.current_track_id, Some(tracks[1]));
    assert!(snapshot.is_playing);
    assert!(
        snapshot.position_ms < 500,
        "switched lane restarts from zero, got {}ms",
        snapshot.position_ms
    );

    // Preload resolution was the only resolution of the next track
    assert_eq!(player.resolver.resolve_count(tracks[1]), 1);

    let mut preload_events = 0;
    let mut crossfade_events = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            PlayerEvent::TrackPreloaded { .. } => preload_events += 1,
            PlayerEvent::CrossfadeStarted { .. } => crossfade_events += 1,
            _ => {}
        }
    }
    assert_eq!(preload_events, 1);
    assert_eq!(crossfade_events, 0);
}

/// Crossfade enabled concurrently with gapless: the preload slot stays
/// empty at all times (crossfade takes precedence).
#[tokio::test(start_paused = true)]
async fn gapless_is_inert_while_crossfade_is_enabled() {
    let tracks = track_ids(2);
    let player = start_player(&[(tracks[0], 10_000), (tracks[1], 8_000)]).await;
    player
        .engine
        .apply_settings(PlayerPrefs {
            crossfade_enabled: true,
            crossfade_ms: 2_000,
            gapless_enabled: true,
            ..Default::default()
        })
        .await
        .unwrap();

    let mut events = player.engine.subscribe_events();
    player
        .engine
        .play_track(tracks[0], Some(tracks.clone()))
        .await
        .unwrap();

    // Deep inside the preload window but before the fade window: the idle
    // lane must still be empty
    sleep(Duration::from_millis(7_500)).await;
    let diag = player.engine.lane_diagnostics().await;
    assert!(
        diag.lanes.len() == 1 || diag.lanes.iter().all(|l| l.track_id != Some(tracks[1])),
        "no preload while crossfade is enabled"
    );

    // Through the boundary: the transition was a crossfade, never a preload
    sleep(Duration::from_millis(3_000)).await;
    let mut saw_preload = false;
    let mut saw_crossfade = false;
    while let Ok(event) = events.try_recv() {
        match event {
            PlayerEvent::TrackPreloaded { .. } => saw_preload = true,
            PlayerEvent::CrossfadeStarted { .. } => saw_crossfade = true,
            _ => {}
        }
    }
    assert!(!saw_preload, "preload slot must stay empty under crossfade");
    assert!(saw_crossfade);
}

/// A queue change that displaces the preloaded track discards the preload;
/// the new next track is preloaded instead and wins the boundary.
#[tokio::test(start_paused = true)]
async fn queue_change_invalidates_stale_preload() {
    let tracks = track_ids(3);
    let player = start_player(&[
        (tracks[0], 10_000),
        (tracks[1], 8_000),
        (tracks[2], 8_000),
    ])
    .await;
    player.engine.apply_settings(gapless_prefs()).await.unwrap();

    player
        .engine
        .play_track(tracks[0], Some(vec![tracks[0], tracks[1]]))
        .await
        .unwrap();

    // t=7s: tracks[1] is preloaded
    sleep(Duration::from_millis(7_000)).await;
    let diag = player.engine.lane_diagnostics().await;
    assert!(diag.lanes.iter().any(|l| l.track_id == Some(tracks[1])));

    // Insert tracks[2] right after the current track; the old preload no
    // longer names the literal next entry
    player
        .engine
        .add_to_queue(vec![tracks[2]], QueuePosition::Next)
        .await
        .unwrap();

    let diag = player.engine.lane_diagnostics().await;
    assert!(
        diag.lanes.iter().all(|l| l.track_id != Some(tracks[1])),
        "displaced preload must be released"
    );

    // The preloader picks up the new next track and the switch goes to it
    sleep(Duration::from_millis(3_300)).await;
    let snapshot = player.engine.snapshot().await;
    assert_eq!(snapshot.current_track_id, Some(tracks[2]));
    assert!(snapshot.is_playing);
}

/// With gapless disabled there is no preload; the boundary falls back to
/// an ordinary (possibly gapped) next() that resolves at track end.
#[tokio::test(start_paused = true)]
async fn disabled_gapless_falls_back_to_plain_next() {
    let tracks = track_ids(2);
    let player = start_player(&[(tracks[0], 3_000), (tracks[1], 8_000)]).await;
    player
        .engine
        .apply_settings(PlayerPrefs {
            gapless_enabled: false,
            crossfade_enabled: false,
            ..Default::default()
        })
        .await
        .unwrap();

    player
        .engine
        .play_track(tracks[0], Some(tracks.clone()))
        .await
        .unwrap();

    // No resolution of the next track before the end
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(player.resolver.resolve_count(tracks[1]), 0);

    sleep(Duration::from_millis(1_000)).await;
    let snapshot = player.engine.snapshot().await;
    assert_eq!(snapshot.current_track_id, Some(tracks[1]));
    assert!(snapshot.is_playing);
    assert_eq!(player.resolver.resolve_count(tracks[1]), 1);
}

/// A preload that fails to resolve leaves the slot empty and the natural
/// boundary degrades to the ordinary next() path.
#[tokio::test(start_paused = true)]
async fn failed_preload_degrades_to_gapped_transition() {
    let tracks = track_ids(2);
    let player = start_player(&[(tracks[0], 6_000), (tracks[1], 8_000)]).await;
    player.engine.apply_settings(gapless_prefs()).await.unwrap();
    player.resolver.fail(tracks[1]);

    player
        .engine
        .play_track(tracks[0], Some(tracks.clone()))
        .await
        .unwrap();

    // The preloader keeps trying and failing inside the window; the slot
    // stays empty
    sleep(Duration::from_millis(4_000)).await;
    let diag = player.engine.lane_diagnostics().await;
    assert!(diag.lanes.iter().all(|l| l.track_id != Some(tracks[1])));

    // With no preload ready at the end, the boundary falls back to the
    // orchestrator's ordinary next(), which resolves (and fails) there
    sleep(Duration::from_millis(2_500)).await;
    let snapshot = player.engine.snapshot().await;
    assert_eq!(snapshot.current_track_id, Some(tracks[1]));
    assert!(!snapshot.is_playing);
    assert!(player.resolver.resolve_count(tracks[1]) > 0);
}
