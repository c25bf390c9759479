//! Playback engine orchestration
//!
//! Owns the queue/shuffle/repeat state machine and the public command
//! surface. The engine mutates state, the lane manager's active lane
//! reflects it, and the crossfade scheduler and gapless preloader run
//! concurrently against the same lane clock, with the transition guard
//! making sure at most one of them (or the natural ended path) performs
//! each track-boundary switch.

use crate::db::settings::{self, PositionRecord};
use crate::error::Result;
use crate::playback::crossfade::CrossfadeScheduler;
use crate::playback::eq::apply_eq;
use crate::playback::lanes::{LaneKey, LaneManager};
use crate::playback::preload::{shared_preload, GaplessPreloader, SharedPreload};
use crate::playback::queue::{QueuePosition, QueueState};
use crate::playback::transition::{shared_transition, SharedTransition, TransitionState};
use crate::resolver::ResourceResolver;
use crate::state::{PlaybackSnapshot, SharedState};
use segue_common::events::PlayerEvent;
use segue_common::params::{clamp_rate, clamp_volume, PlayerPrefs, RepeatMode};
use segue_common::time::now;
use sqlx::{Pool, Sqlite};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tick cadence for end-of-track detection and position updates
const TICK_MS: u64 = 100;
/// Progress event / throttled position write cadence, in ticks
const PROGRESS_EVERY_TICKS: u32 = 50;

/// Shared handles every engine component holds a clone of
#[derive(Clone)]
pub struct EngineCore {
    pub(crate) db: Pool<Sqlite>,
    pub(crate) state: Arc<SharedState>,
    pub(crate) queue: Arc<RwLock<QueueState>>,
    pub(crate) lanes: Arc<RwLock<LaneManager>>,
    pub(crate) transition: SharedTransition,
    pub(crate) preload: SharedPreload,
    pub(crate) prefs: Arc<RwLock<PlayerPrefs>>,
    pub(crate) resolver: Arc<dyn ResourceResolver>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) settle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EngineCore {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn emit(&self, event: PlayerEvent) {
        self.state.broadcast_event(event);
    }

    /// Disarm a scheduled (not yet fired) crossfade timer
    pub(crate) fn cancel_scheduled(&self) {
        let mut guard = self.transition.lock().unwrap();
        if guard.is_scheduled() {
            *guard = TransitionState::Idle;
        }
    }

    /// Abort an in-flight fade: cancel the settle step, restore the
    /// outgoing lane's gain, release the half-started incoming lane, and
    /// clear the guard. The track then plays to its natural end.
    pub(crate) async fn abort_fade(&self) {
        let was_fading = {
            let mut guard = self.transition.lock().unwrap();
            let fading = guard.is_fading();
            if fading {
                *guard = TransitionState::Idle;
            }
            fading
        };
        if !was_fading {
            return;
        }

        if let Some(settle) = self.settle.lock().unwrap().take() {
            settle.abort();
        }

        let mut lanes = self.lanes.write().await;
        let (active, inactive) = lanes.pair_mut();
        active.graph_mut().gain_mut().set(1.0);
        inactive.transport_mut().pause();
        inactive.release();
        inactive.graph_mut().gain_mut().set(1.0);
        info!("Crossfade aborted");
    }

    /// Discard the preload record and release the preloaded resource
    pub(crate) async fn invalidate_preload(&self) {
        let record = self.preload.lock().unwrap().take();
        let Some(rec) = record else {
            return;
        };

        let mut lanes = self.lanes.write().await;
        if lanes.active_key() != rec.lane {
            if let Some(lane) = lanes.lane_mut(rec.lane) {
                if lane.track_id() == Some(rec.track_id) {
                    lane.release();
                    debug!("Invalidated preload of {}", rec.track_id);
                }
            }
        }
    }

    /// Write the position record (or clear it when no track is current)
    pub(crate) async fn persist_position(&self) {
        let status = self.state.status().await;
        let record = status.current_track.map(|track_id| PositionRecord {
            track_id,
            position_ms: status.position_ms,
            playing: status.is_playing,
        });

        if let Err(e) = settings::save_position(&self.db, record).await {
            warn!("Failed to persist playback position: {}", e);
        }
    }
}

/// Per-lane diagnostics for the UI and tests
#[derive(Debug, Clone, serde::Serialize)]
pub struct LaneInfo {
    pub key: LaneKey,
    pub track_id: Option<Uuid>,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub gain: f32,
    pub playing: bool,
}

/// Snapshot of both lanes and the transition guard
#[derive(Debug, Clone, serde::Serialize)]
pub struct LaneDiagnostics {
    pub active: LaneKey,
    pub transition: &'static str,
    pub lanes: Vec<LaneInfo>,
}

/// Playback engine: public command surface and background loops
#[derive(Clone)]
pub struct PlayerEngine {
    core: EngineCore,
}

impl PlayerEngine {
    /// Create a new engine against an initialized database and a resolver
    pub async fn new(db: Pool<Sqlite>, resolver: Arc<dyn ResourceResolver>) -> Result<Self> {
        info!("Creating playback engine");

        let prefs = settings::load_prefs(&db).await?;
        let volume = settings::get_volume(&db).await?;
        let rate = settings::get_playback_rate(&db).await?;

        let state = Arc::new(SharedState::new());
        {
            let mut status = state.status.write().await;
            status.volume = volume;
            status.playback_rate = rate;
        }

        let mut lanes = LaneManager::new();
        lanes.set_master_gain(volume);

        let core = EngineCore {
            db,
            state,
            queue: Arc::new(RwLock::new(QueueState::new())),
            lanes: Arc::new(RwLock::new(lanes)),
            transition: shared_transition(),
            preload: shared_preload(),
            prefs: Arc::new(RwLock::new(prefs)),
            resolver,
            running: Arc::new(AtomicBool::new(false)),
            settle: Arc::new(Mutex::new(None)),
        };

        Ok(Self { core })
    }

    /// Start background loops and restore the persisted position
    pub async fn start(&self) -> Result<()> {
        info!("Starting playback engine");
        self.core.running.store(true, Ordering::SeqCst);

        self.restore_persisted().await?;

        let engine = self.clone();
        tokio::spawn(async move {
            engine.tick_loop().await;
        });

        tokio::spawn(CrossfadeScheduler::new(self.core.clone()).run());
        tokio::spawn(GaplessPreloader::new(self.core.clone()).run());

        info!("Playback engine started");
        Ok(())
    }

    /// Stop the engine: cancel transitions, release lanes, persist
    pub async fn stop(&self) {
        info!("Stopping playback engine");
        self.core.running.store(false, Ordering::SeqCst);

        self.core.cancel_scheduled();
        self.core.abort_fade().await;
        self.core.invalidate_preload().await;
        self.core.persist_position().await;

        self.core.lanes.write().await.release_all();
        info!("Playback engine stopped");
    }

    /// Restore the last-known position; `playing` is honored only when the
    /// resume-on-load preference is set
    async fn restore_persisted(&self) -> Result<()> {
        let Some(record) = settings::load_position(&self.core.db).await? else {
            return Ok(());
        };

        let prefs = self.core.prefs.read().await.clone();
        let resume = prefs.resume_on_load && record.playing;

        // Seed the queue with the restored track; the library layer
        // replaces the queue when the user picks something new
        self.core
            .queue
            .write()
            .await
            .set(vec![record.track_id], Some(record.track_id));

        let rate = self.core.state.status().await.playback_rate;

        match self.core.resolver.resolve(record.track_id).await {
            Ok(Some(handle)) => {
                let (position_ms, duration_ms) = {
                    let mut lanes = self.core.lanes.write().await;
                    let lane = lanes.active_lane();
                    lane.assign(handle);
                    apply_eq(lane, prefs.eq_enabled, &prefs.eq_bands);
                    lane.transport_mut().set_rate(rate as f64);
                    lane.transport_mut()
                        .seek(Duration::from_millis(record.position_ms));
                    if resume {
                        lane.transport_mut().play();
                    }
                    (
                        lane.transport().position().as_millis() as u64,
                        lane.transport().duration().map(|d| d.as_millis() as u64),
                    )
                };

                let mut status = self.core.state.status.write().await;
                status.current_track = Some(record.track_id);
                status.position_ms = position_ms;
                status.duration_ms = duration_ms;
                status.is_playing = resume;
                info!(
                    "Restored track {} at {}ms (resume: {})",
                    record.track_id, record.position_ms, resume
                );
            }
            _ => {
                // Track is gone; restore the pointer, stay paused
                let mut status = self.core.state.status.write().await;
                status.current_track = Some(record.track_id);
                status.position_ms = record.position_ms;
                status.is_playing = false;
                debug!("Restored track {} is not resolvable yet", record.track_id);
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Command surface
    // ------------------------------------------------------------------

    /// Set the queue (shuffled with `track_id` first when shuffle is on)
    /// and start `track_id` from zero
    pub async fn play_track(&self, track_id: Uuid, queue: Option<Vec<Uuid>>) -> Result<()> {
        let shuffle = self.core.state.status().await.shuffle;

        {
            let mut q = self.core.queue.write().await;
            match queue {
                Some(ids) => {
                    q.set(ids, Some(track_id));
                    if shuffle {
                        q.shuffle_keep_current(&mut rand::thread_rng());
                    }
                }
                None => {
                    if !q.advance_to(track_id) {
                        q.set(vec![track_id], Some(track_id));
                    }
                }
            }
        }
        self.core.emit(PlayerEvent::QueueChanged { timestamp: now() });

        self.load_and_start(track_id, true).await
    }

    /// Replace the queue (optionally shuffled) and start at its first entry
    pub async fn play_tracks(&self, ids: Vec<Uuid>, shuffle: Option<bool>) -> Result<()> {
        if let Some(on) = shuffle {
            self.core.state.status.write().await.shuffle = on;
        }
        let shuffle_on = self.core.state.status().await.shuffle;

        let first = {
            let mut q = self.core.queue.write().await;
            q.set(ids, None);
            if shuffle_on {
                q.shuffle_all(&mut rand::thread_rng());
            }
            q.current_track()
        };
        self.core.emit(PlayerEvent::QueueChanged { timestamp: now() });

        match first {
            Some(track) => self.load_and_start(track, true).await,
            None => Ok(()),
        }
    }

    /// Resume playback; never alters the current position
    pub async fn play(&self) -> Result<()> {
        let current = self.core.state.current_track().await;

        let started = {
            let mut lanes = self.core.lanes.write().await;
            let lane = lanes.active_lane();
            if lane.has_resource() {
                lane.transport_mut().play();
                true
            } else {
                false
            }
        };

        if !started {
            // A current track without a loaded resource (e.g. restored but
            // not resolvable at startup) gets one more resolution attempt
            if let Some(track) = current {
                return self.load_and_start(track, true).await;
            }
            return Ok(());
        }

        self.core.state.status.write().await.is_playing = true;
        self.core.emit(PlayerEvent::PlaybackStateChanged {
            playing: true,
            timestamp: now(),
        });
        self.core.persist_position().await;
        info!("Play");
        Ok(())
    }

    /// Pause playback; never alters the current position
    pub async fn pause(&self) -> Result<()> {
        self.core.cancel_scheduled();
        // Pausing mid-fade abandons the fade; the boundary replays when
        // playback resumes
        self.core.abort_fade().await;

        let position_ms = {
            let mut lanes = self.core.lanes.write().await;
            let lane = lanes.active_lane();
            lane.transport_mut().pause();
            lane.transport().position().as_millis() as u64
        };

        {
            let mut status = self.core.state.status.write().await;
            status.is_playing = false;
            status.position_ms = position_ms;
        }
        self.core.emit(PlayerEvent::PlaybackStateChanged {
            playing: false,
            timestamp: now(),
        });
        self.core.persist_position().await;
        info!("Pause at {}ms", position_ms);
        Ok(())
    }

    pub async fn toggle_play(&self) -> Result<()> {
        if self.core.state.is_playing().await {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Advance one queue position, resolving the repeat mode
    pub async fn next(&self) -> Result<()> {
        let repeat = self.core.state.status().await.repeat;

        if repeat == RepeatMode::Track {
            return self.replay_current().await;
        }

        let advanced = self.core.queue.write().await.advance();
        match advanced {
            Some(track) => self.load_and_start(track, true).await,
            None => {
                if repeat == RepeatMode::Queue {
                    let first = self.core.queue.write().await.wrap_to_start();
                    match first {
                        Some(track) => self.load_and_start(track, true).await,
                        None => Ok(()),
                    }
                } else {
                    // Off: no-op past the last element
                    Ok(())
                }
            }
        }
    }

    /// Retreat one queue position; no-op at the start of the queue
    pub async fn previous(&self) -> Result<()> {
        let previous = self.core.queue.write().await.retreat();
        match previous {
            Some(track) => self.load_and_start(track, true).await,
            None => Ok(()),
        }
    }

    /// Seek within the current track (milliseconds, clamped to duration)
    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.core.cancel_scheduled();

        let seeked = {
            let mut lanes = self.core.lanes.write().await;
            let lane = lanes.active_lane();
            if !lane.has_resource() {
                None
            } else {
                lane.transport_mut()
                    .seek(Duration::from_millis(position_ms));
                Some(lane.transport().position().as_millis() as u64)
            }
        };

        if let Some(actual_ms) = seeked {
            self.core.state.status.write().await.position_ms = actual_ms;
            self.core.persist_position().await;
        }
        Ok(())
    }

    /// Set master volume (clamped to [0, 1])
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        let clamped = clamp_volume(volume);

        self.core.lanes.write().await.set_master_gain(clamped);
        self.core.state.status.write().await.volume = clamped;

        settings::set_volume(&self.core.db, clamped).await?;
        self.core.persist_position().await;
        self.core.emit(PlayerEvent::VolumeChanged {
            volume: clamped,
            timestamp: now(),
        });
        Ok(())
    }

    /// Set playback rate (clamped to [0.25, 2])
    pub async fn set_playback_rate(&self, rate: f32) -> Result<()> {
        let clamped = clamp_rate(rate);
        self.core.cancel_scheduled();

        {
            let mut lanes = self.core.lanes.write().await;
            for key in [LaneKey::A, LaneKey::B] {
                if let Some(lane) = lanes.lane_mut(key) {
                    lane.transport_mut().set_rate(clamped as f64);
                }
            }
        }
        self.core.state.status.write().await.playback_rate = clamped;

        settings::set_playback_rate(&self.core.db, clamped).await?;
        self.core.persist_position().await;
        self.core.emit(PlayerEvent::RateChanged {
            rate: clamped,
            timestamp: now(),
        });
        Ok(())
    }

    /// Turn shuffle on/off; turning it on reshuffles with the playing
    /// track fixed first
    pub async fn set_shuffle(&self, on: bool) -> Result<()> {
        let was_on = {
            let mut status = self.core.state.status.write().await;
            let was = status.shuffle;
            status.shuffle = on;
            was
        };

        if on && !was_on {
            self.core
                .queue
                .write()
                .await
                .shuffle_keep_current(&mut rand::thread_rng());
        }

        self.core.cancel_scheduled();
        self.core.invalidate_preload().await;
        self.core.emit(PlayerEvent::QueueChanged { timestamp: now() });
        Ok(())
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        let on = self.core.state.status().await.shuffle;
        self.set_shuffle(!on).await
    }

    pub async fn set_repeat(&self, mode: RepeatMode) -> Result<()> {
        self.core.state.status.write().await.repeat = mode;
        if mode == RepeatMode::Track {
            self.core.cancel_scheduled();
            self.core.invalidate_preload().await;
        }
        Ok(())
    }

    /// Insert tracks after the current entry or at the end; duplicates
    /// already present in the queue are skipped
    pub async fn add_to_queue(&self, ids: Vec<Uuid>, position: QueuePosition) -> Result<()> {
        let added = self.core.queue.write().await.insert(ids, position);
        if added > 0 {
            self.core.cancel_scheduled();
            self.core.invalidate_preload().await;
            self.core.emit(PlayerEvent::QueueChanged { timestamp: now() });
        }
        Ok(())
    }

    /// Pure index move; no-op on out-of-range or equal indices
    pub async fn reorder_queue(&self, from: usize, to: usize) -> Result<()> {
        let moved = self.core.queue.write().await.reorder(from, to);
        if moved {
            self.core.cancel_scheduled();
            self.core.invalidate_preload().await;
            self.core.emit(PlayerEvent::QueueChanged { timestamp: now() });
        }
        Ok(())
    }

    /// Remove one entry; removing the current track advances to whatever
    /// takes its slot
    pub async fn remove_from_queue(&self, track_id: Uuid) -> Result<()> {
        let (removed, was_current, new_current) = {
            let mut q = self.core.queue.write().await;
            let was_current = q.current_track() == Some(track_id);
            let removed = q.remove(track_id);
            (removed, was_current, q.current_track())
        };
        if !removed {
            return Ok(());
        }

        self.core.cancel_scheduled();
        self.core.invalidate_preload().await;
        self.core.emit(PlayerEvent::QueueChanged { timestamp: now() });

        if was_current {
            let keep_playing = self.core.state.is_playing().await;
            match new_current {
                Some(track) => self.load_and_start(track, keep_playing).await?,
                None => self.stop_and_clear().await,
            }
        }
        Ok(())
    }

    /// Empty the queue and reset playback state; clears the persisted record
    pub async fn clear_queue(&self) -> Result<()> {
        self.core.cancel_scheduled();
        self.core.abort_fade().await;
        self.core.invalidate_preload().await;

        self.core.queue.write().await.clear();
        self.core.emit(PlayerEvent::QueueChanged { timestamp: now() });
        self.stop_and_clear().await;
        Ok(())
    }

    /// Apply new preferences reactively; no active-track restart required
    pub async fn apply_settings(&self, prefs: PlayerPrefs) -> Result<()> {
        settings::save_prefs(&self.core.db, &prefs).await?;
        *self.core.prefs.write().await = prefs.clone();

        // An armed timer always re-arms from the new settings on the next
        // poll; a fade in flight is only torn down when fading goes away
        self.core.cancel_scheduled();
        if !prefs.crossfade_enabled {
            self.core.abort_fade().await;
        }
        if !prefs.gapless_active() {
            self.core.invalidate_preload().await;
        }

        {
            let mut lanes = self.core.lanes.write().await;
            for key in [LaneKey::A, LaneKey::B] {
                if let Some(lane) = lanes.lane_mut(key) {
                    apply_eq(lane, prefs.eq_enabled, &prefs.eq_bands);
                }
            }
        }

        info!(
            "Settings applied: crossfade={} ({}ms), gapless={}, eq={} ({} bands)",
            prefs.crossfade_enabled,
            prefs.crossfade_ms,
            prefs.gapless_enabled,
            prefs.eq_enabled,
            prefs.eq_bands.len()
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    /// Read-only state snapshot for the UI layer
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let queue = self.core.queue.read().await.to_vec();
        self.core.state.snapshot(queue).await
    }

    /// Current preferences
    pub async fn prefs(&self) -> PlayerPrefs {
        self.core.prefs.read().await.clone()
    }

    /// Subscribe to the engine event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.core.state.subscribe_events()
    }

    /// Shared state handle for the HTTP layer
    pub fn shared_state(&self) -> Arc<SharedState> {
        Arc::clone(&self.core.state)
    }

    /// Lane-level diagnostics (also exercised heavily by the tests)
    pub async fn lane_diagnostics(&self) -> LaneDiagnostics {
        let lanes = self.core.lanes.read().await;
        let ramp_now = tokio::time::Instant::now();

        let infos = [LaneKey::A, LaneKey::B]
            .into_iter()
            .filter_map(|key| {
                lanes.lane(key).map(|lane| LaneInfo {
                    key,
                    track_id: lane.track_id(),
                    position_ms: lane.transport().position().as_millis() as u64,
                    duration_ms: lane.transport().duration().map(|d| d.as_millis() as u64),
                    gain: lane.graph().gain().value_at(ramp_now),
                    playing: lane.transport().is_playing(),
                })
            })
            .collect();

        let transition = {
            let guard = self.core.transition.lock().unwrap();
            match *guard {
                TransitionState::Idle => "idle",
                TransitionState::Scheduled { .. } => "scheduled",
                TransitionState::Fading { .. } => "fading",
            }
        };

        LaneDiagnostics {
            active: lanes.active_key(),
            transition,
            lanes: infos,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Load a track into the active lane and optionally start it.
    ///
    /// Any pending transition is cancelled first; a resolution failure
    /// surfaces as a TrackUnplayable event and leaves playback paused.
    pub(crate) async fn load_and_start(&self, track_id: Uuid, play_now: bool) -> Result<()> {
        self.core.cancel_scheduled();
        self.core.abort_fade().await;
        self.core.invalidate_preload().await;

        let prefs = self.core.prefs.read().await.clone();
        let rate = self.core.state.status().await.playback_rate;

        match self.core.resolver.resolve(track_id).await {
            Ok(Some(handle)) => {
                let duration_ms = {
                    let mut lanes = self.core.lanes.write().await;
                    let lane = lanes.active_lane();
                    lane.transport_mut().pause();
                    lane.assign(handle);
                    apply_eq(lane, prefs.eq_enabled, &prefs.eq_bands);
                    lane.transport_mut().set_rate(rate as f64);
                    lane.graph_mut().gain_mut().set(1.0);
                    if play_now {
                        lane.transport_mut().play();
                    }
                    lane.transport().duration().map(|d| d.as_millis() as u64)
                };

                {
                    let mut status = self.core.state.status.write().await;
                    status.current_track = Some(track_id);
                    status.position_ms = 0;
                    status.duration_ms = duration_ms;
                    status.is_playing = play_now;
                }

                self.core.emit(PlayerEvent::TrackChanged {
                    track_id: Some(track_id),
                    timestamp: now(),
                });
                if play_now {
                    self.core.emit(PlayerEvent::TrackStarted {
                        track_id,
                        timestamp: now(),
                    });
                }
                self.core.persist_position().await;
                info!("Loaded track {} (playing: {})", track_id, play_now);
                Ok(())
            }
            other => {
                if let Err(e) = other {
                    warn!("Resolve failed for {}: {}", track_id, e);
                }

                {
                    let mut lanes = self.core.lanes.write().await;
                    let lane = lanes.active_lane();
                    lane.transport_mut().pause();
                    lane.release();
                }
                {
                    let mut status = self.core.state.status.write().await;
                    status.current_track = Some(track_id);
                    status.position_ms = 0;
                    status.duration_ms = None;
                    status.is_playing = false;
                }

                self.core.emit(PlayerEvent::TrackUnplayable {
                    track_id,
                    timestamp: now(),
                });
                self.core.persist_position().await;
                warn!("Track {} is unplayable", track_id);
                Ok(())
            }
        }
    }

    /// Replay the current track from zero (repeat-track)
    async fn replay_current(&self) -> Result<()> {
        let track = {
            let mut lanes = self.core.lanes.write().await;
            let lane = lanes.active_lane();
            if !lane.has_resource() {
                None
            } else {
                lane.transport_mut().seek(Duration::ZERO);
                lane.transport_mut().play();
                lane.track_id()
            }
        };

        let Some(track_id) = track else {
            return Ok(());
        };

        {
            let mut status = self.core.state.status.write().await;
            status.position_ms = 0;
            status.is_playing = true;
        }
        self.core.emit(PlayerEvent::TrackStarted {
            track_id,
            timestamp: now(),
        });
        self.core.persist_position().await;
        Ok(())
    }

    /// Release the active resource and reset state; clears the record
    async fn stop_and_clear(&self) {
        {
            let mut lanes = self.core.lanes.write().await;
            lanes.release_all();
        }
        {
            let mut status = self.core.state.status.write().await;
            status.current_track = None;
            status.position_ms = 0;
            status.duration_ms = None;
            status.is_playing = false;
        }
        self.core.emit(PlayerEvent::TrackChanged {
            track_id: None,
            timestamp: now(),
        });
        self.core.persist_position().await;
    }

    /// End the current track naturally: replay, advance, wrap, or stop
    async fn natural_advance(&self) -> Result<()> {
        let repeat = self.core.state.status().await.repeat;

        if repeat == RepeatMode::Track {
            return self.replay_current().await;
        }

        let advanced = self.core.queue.write().await.advance();
        match advanced {
            Some(track) => self.load_and_start(track, true).await,
            None => {
                if repeat == RepeatMode::Queue {
                    let first = self.core.queue.write().await.wrap_to_start();
                    match first {
                        Some(track) => self.load_and_start(track, true).await,
                        None => {
                            self.stop_at_end().await;
                            Ok(())
                        }
                    }
                } else {
                    self.stop_at_end().await;
                    Ok(())
                }
            }
        }
    }

    /// End of queue with repeat off: stop, leaving the current track in place
    async fn stop_at_end(&self) {
        {
            let mut lanes = self.core.lanes.write().await;
            lanes.active_lane().transport_mut().pause();
        }
        {
            let mut status = self.core.state.status.write().await;
            status.is_playing = false;
        }
        self.core.emit(PlayerEvent::PlaybackStateChanged {
            playing: false,
            timestamp: now(),
        });
        self.core.persist_position().await;
        info!("Reached end of queue");
    }

    /// Un-faded hard switch to the preloaded lane at track end
    async fn hard_switch(&self, next_track: Uuid) -> Result<()> {
        let (position_ms, duration_ms) = {
            let mut lanes = self.core.lanes.write().await;
            let rate = {
                let lane = lanes.active_lane();
                lane.transport().rate()
            };
            {
                let (active, inactive) = lanes.pair_mut();
                active.transport_mut().pause();
                active.release();
                active.graph_mut().gain_mut().set(1.0);

                inactive.transport_mut().set_rate(rate);
                inactive.transport_mut().seek(Duration::ZERO);
                inactive.graph_mut().gain_mut().set(1.0);
                inactive.transport_mut().play();
            }
            lanes.swap();

            let lane = lanes.active_lane();
            (
                lane.transport().position().as_millis() as u64,
                lane.transport().duration().map(|d| d.as_millis() as u64),
            )
        };

        self.core.queue.write().await.advance_to(next_track);

        {
            let mut status = self.core.state.status.write().await;
            status.current_track = Some(next_track);
            status.position_ms = position_ms;
            status.duration_ms = duration_ms;
            status.is_playing = true;
        }

        self.core.emit(PlayerEvent::TrackChanged {
            track_id: Some(next_track),
            timestamp: now(),
        });
        self.core.emit(PlayerEvent::TrackStarted {
            track_id: next_track,
            timestamp: now(),
        });
        self.core.persist_position().await;
        info!("Gapless switch to {}", next_track);
        Ok(())
    }

    /// The active lane hit its natural end
    async fn handle_track_end(&self) -> Result<()> {
        // Suppressed while a crossfade for this lane is in flight; the
        // settle step owns the boundary then
        if self.core.transition.lock().unwrap().is_fading() {
            return Ok(());
        }

        let repeat = self.core.state.status().await.repeat;
        if repeat == RepeatMode::Track {
            return self.replay_current().await;
        }

        // A valid preload for the actually-next track wins the boundary
        let next = self.core.queue.read().await.peek_next();
        let preloaded = {
            let mut slot = self.core.preload.lock().unwrap();
            match (*slot, next) {
                (Some(rec), Some(next_track)) if rec.track_id == next_track => {
                    *slot = None;
                    Some(next_track)
                }
                _ => None,
            }
        };

        match preloaded {
            Some(next_track) => self.hard_switch(next_track).await,
            None => self.natural_advance().await,
        }
    }

    /// Position/ended tick loop (also throttles progress persistence)
    async fn tick_loop(self) {
        let mut tick = interval(Duration::from_millis(TICK_MS));
        let mut progress_counter: u32 = 0;

        loop {
            tick.tick().await;
            if !self.core.is_running() {
                debug!("Tick loop stopping");
                break;
            }

            if !self.core.state.is_playing().await {
                progress_counter = 0;
                continue;
            }

            let probe = {
                let lanes = self.core.lanes.read().await;
                lanes.lane(lanes.active_key()).map(|lane| {
                    (
                        lane.transport().position().as_millis() as u64,
                        lane.transport().duration().map(|d| d.as_millis() as u64),
                        lane.transport().ended(),
                    )
                })
            };
            let Some((position_ms, duration_ms, ended)) = probe else {
                continue;
            };

            {
                let mut status = self.core.state.status.write().await;
                status.position_ms = position_ms;
                status.duration_ms = duration_ms;
            }

            if ended {
                if let Err(e) = self.handle_track_end().await {
                    warn!("Track-end handling failed: {}", e);
                }
                progress_counter = 0;
                continue;
            }

            // Discrete commands persist immediately; the tick stream is
            // throttled to bound write volume
            progress_counter += 1;
            if progress_counter >= PROGRESS_EVERY_TICKS {
                progress_counter = 0;

                let status = self.core.state.status().await;
                if let (Some(track_id), Some(duration_ms)) =
                    (status.current_track, status.duration_ms)
                {
                    self.core.emit(PlayerEvent::PlaybackProgress {
                        track_id,
                        position_ms: status.position_ms,
                        duration_ms,
                        timestamp: now(),
                    });
                }
                self.core.persist_position().await;
            }
        }
    }
}
