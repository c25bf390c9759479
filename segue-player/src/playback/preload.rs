//! Gapless preloader
//!
//! A look-ahead poller that prepares the next track in the idle lane
//! during the trailing preload window, so the natural end of the active
//! track can hard-switch to it with no gap. Mutually exclusive with
//! crossfading: when crossfade is enabled the preload record stays empty.

use crate::playback::engine::EngineCore;
use crate::playback::eq::apply_eq;
use crate::playback::lanes::LaneKey;
use segue_common::events::PlayerEvent;
use segue_common::params::{RepeatMode, LOOKAHEAD_POLL_MS, PRELOAD_WINDOW_MS};
use segue_common::time::now;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

/// Which inactive lane holds a ready-to-play next track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadRecord {
    pub lane: LaneKey,
    pub track_id: Uuid,
}

/// Shared preload slot; `None` means nothing is preloaded
pub type SharedPreload = Arc<Mutex<Option<PreloadRecord>>>;

/// New, empty preload slot
pub fn shared_preload() -> SharedPreload {
    Arc::new(Mutex::new(None))
}

/// Prepares the next track in the idle lane for a gapless hard switch
#[derive(Clone)]
pub struct GaplessPreloader {
    core: EngineCore,
}

impl GaplessPreloader {
    pub fn new(core: EngineCore) -> Self {
        Self { core }
    }

    pub async fn run(self) {
        let mut tick = interval(Duration::from_millis(LOOKAHEAD_POLL_MS));

        loop {
            tick.tick().await;
            if !self.core.is_running() {
                debug!("Gapless preloader stopping");
                break;
            }
            self.poll().await;
        }
    }

    async fn poll(&self) {
        let prefs = self.core.prefs.read().await.clone();

        // Crossfade takes precedence; a disabled preloader holds nothing
        if !prefs.gapless_active() {
            self.core.invalidate_preload().await;
            return;
        }

        let status = self.core.state.status().await;
        if !status.is_playing {
            return;
        }
        if status.repeat == RepeatMode::Track {
            self.core.invalidate_preload().await;
            return;
        }

        // Never preload while a lane-swap transition is under way
        if !self.core.transition.lock().unwrap().is_idle() {
            return;
        }

        let next = self.core.queue.read().await.peek_next();
        let Some(next_track) = next else {
            self.core.invalidate_preload().await;
            return;
        };

        // A preload for a track that is no longer next is discarded
        let existing = *self.core.preload.lock().unwrap();
        match existing {
            Some(rec) if rec.track_id == next_track => return,
            Some(_) => self.core.invalidate_preload().await,
            None => {}
        }

        let within_window = {
            let lanes = self.core.lanes.read().await;
            lanes
                .lane(lanes.active_key())
                .and_then(|lane| lane.transport().remaining_wall())
                .is_some_and(|remaining| {
                    remaining <= Duration::from_millis(PRELOAD_WINDOW_MS)
                })
        };
        if !within_window {
            return;
        }

        // Resolution failure just means the ended path falls back to an
        // ordinary, possibly gapped next()
        let handle = match self.core.resolver.resolve(next_track).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                debug!("Preload target {} is unplayable", next_track);
                return;
            }
            Err(e) => {
                debug!("Preload resolve failed for {}: {}", next_track, e);
                return;
            }
        };

        {
            let mut lanes = self.core.lanes.write().await;
            let lane_key = lanes.inactive_key();
            let inactive = lanes.inactive_lane();

            // Assigned but not started; the hard switch starts it at ended
            inactive.assign(handle);
            apply_eq(inactive, prefs.eq_enabled, &prefs.eq_bands);
            inactive.graph_mut().gain_mut().set(1.0);

            *self.core.preload.lock().unwrap() = Some(PreloadRecord {
                lane: lane_key,
                track_id: next_track,
            });
            info!("Preloaded {} into lane {}", next_track, lane_key);
        }

        self.core.emit(PlayerEvent::TrackPreloaded {
            track_id: next_track,
            timestamp: now(),
        });
    }
}
