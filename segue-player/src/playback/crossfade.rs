//! Crossfade scheduler
//!
//! A look-ahead poller that arms a timer at `remaining − fade`, then drives
//! a timed dual-lane fade: the incoming track starts silent in the idle
//! lane, both gains ramp over the fade window on the lane clock, and a
//! short settle delay later the lanes swap.
//!
//! All transitions are serialized through the shared transition guard;
//! every exit path (settle completion, resolution failure, settings-disable
//! abort) returns the guard to `Idle`.

use crate::playback::engine::EngineCore;
use crate::playback::eq::apply_eq;
use crate::playback::transition::TransitionState;
use segue_common::events::PlayerEvent;
use segue_common::params::{RepeatMode, FADE_SETTLE_MS, LOOKAHEAD_POLL_MS};
use segue_common::time::now;
use std::time::Duration;
use tokio::time::{interval, sleep, sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Drives crossfades between consecutive tracks
#[derive(Clone)]
pub struct CrossfadeScheduler {
    core: EngineCore,
}

impl CrossfadeScheduler {
    pub fn new(core: EngineCore) -> Self {
        Self { core }
    }

    /// Poll loop: re-arms the fade timer every tick, fires it on deadline.
    ///
    /// Only one timer is armed at a time; each poll replaces the previous
    /// deadline, which is what cancels a stale timer after a seek or queue
    /// change.
    pub async fn run(self) {
        let mut tick = interval(Duration::from_millis(LOOKAHEAD_POLL_MS));

        loop {
            if !self.core.is_running() {
                debug!("Crossfade scheduler stopping");
                break;
            }

            let armed = self.core.transition.lock().unwrap().fire_at();

            tokio::select! {
                _ = tick.tick() => {
                    self.poll().await;
                }
                _ = sleep_until(armed.unwrap_or_else(Instant::now)), if armed.is_some() => {
                    self.begin_fade().await;
                }
            }
        }
    }

    /// One look-ahead pass: compute remaining time on the active lane and
    /// arm (or clear) the fade timer.
    async fn poll(&self) {
        let prefs = self.core.prefs.read().await.clone();
        if !prefs.crossfade_enabled || prefs.crossfade_ms == 0 {
            self.core.cancel_scheduled();
            return;
        }

        let status = self.core.state.status().await;
        if !status.is_playing || status.repeat == RepeatMode::Track {
            self.core.cancel_scheduled();
            return;
        }

        if self.core.transition.lock().unwrap().is_fading() {
            return;
        }

        // No next track in queue: this track plays to its natural end
        let Some(next_track) = self.core.queue.read().await.peek_next() else {
            self.core.cancel_scheduled();
            return;
        };

        let remaining = {
            let lanes = self.core.lanes.read().await;
            lanes
                .lane(lanes.active_key())
                .and_then(|lane| {
                    lane.transport()
                        .remaining_wall()
                        .map(|r| (r, lane.transport().rate()))
                })
        };
        let Some((remaining_wall, rate)) = remaining else {
            // No duration yet: remaining is not finite, nothing to arm
            self.core.cancel_scheduled();
            return;
        };

        // Fade duration is media time; the timer deadline is wall time
        let fade_wall = Duration::from_millis(prefs.crossfade_ms).div_f64(rate);
        let fire_at = Instant::now() + remaining_wall.saturating_sub(fade_wall);

        *self.core.transition.lock().unwrap() = TransitionState::Scheduled {
            next_track,
            fire_at,
        };
    }

    /// Timer fired: Scheduled → Fading, wire the incoming lane, start the
    /// ramps, and schedule the settle step.
    async fn begin_fade(&self) {
        let outgoing = self.core.lanes.read().await.active_key();

        let next_track = {
            let mut guard = self.core.transition.lock().unwrap();
            match *guard {
                TransitionState::Scheduled { next_track, .. } => {
                    *guard = TransitionState::Fading {
                        next_track,
                        outgoing,
                    };
                    next_track
                }
                // Already fading (or cancelled): nothing to do
                _ => return,
            }
        };

        // The queue may have changed between arming and firing
        if self.core.queue.read().await.peek_next() != Some(next_track) {
            self.clear_guard();
            return;
        }

        let prefs = self.core.prefs.read().await.clone();

        // Resolution failure aborts the fade cleanly; the natural ended
        // path will trigger an ordinary next() later
        let handle = match self.core.resolver.resolve(next_track).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                warn!("Crossfade target {} is unplayable, aborting fade", next_track);
                self.clear_guard();
                return;
            }
            Err(e) => {
                warn!("Crossfade resolve failed for {}: {}", next_track, e);
                self.clear_guard();
                return;
            }
        };

        let fade = {
            let mut lanes = self.core.lanes.write().await;
            let ramp_now = Instant::now();
            let (active, inactive) = lanes.pair_mut();

            let Some(remaining) = active.transport().remaining() else {
                // Resource vanished under us; nothing sensible to fade from
                self.clear_guard();
                return;
            };
            let from_track = active.track_id();
            let rate = active.transport().rate();

            // Never longer than what is left of the track, never negative
            let fade_media = Duration::from_millis(prefs.crossfade_ms).min(remaining);
            let fade_wall = fade_media.div_f64(rate);

            inactive.assign(handle);
            apply_eq(inactive, prefs.eq_enabled, &prefs.eq_bands);
            inactive.transport_mut().set_rate(rate);
            inactive.transport_mut().seek(Duration::ZERO);
            inactive.graph_mut().gain_mut().set(0.0);
            inactive.transport_mut().play();

            active
                .graph_mut()
                .gain_mut()
                .ramp_to(0.0, ramp_now, fade_wall, prefs.fade_curve);
            inactive
                .graph_mut()
                .gain_mut()
                .ramp_to(1.0, ramp_now, fade_wall, prefs.fade_curve);

            info!(
                "Crossfade started: {:?} -> {} over {:?}",
                from_track, next_track, fade_media
            );
            (fade_wall, from_track)
        };
        let (fade_wall, from_track) = fade;

        self.core.emit(PlayerEvent::CrossfadeStarted {
            from_track_id: from_track.unwrap_or_else(Uuid::nil),
            to_track_id: next_track,
            fade_ms: fade_wall.as_millis() as u64,
            timestamp: now(),
        });

        // The swap itself happens after a short settle delay
        let scheduler = self.clone();
        let settle = tokio::spawn(async move {
            sleep(fade_wall + Duration::from_millis(FADE_SETTLE_MS)).await;
            scheduler.finish_fade(next_track).await;
        });
        *self.core.settle.lock().unwrap() = Some(settle);
    }

    /// Settle step: stop and release the outgoing lane, flip the active
    /// pointer, update playback state, clear the guard.
    async fn finish_fade(&self, next_track: Uuid) {
        // The fade may have been aborted while we slept
        if !self.core.transition.lock().unwrap().is_fading() {
            return;
        }

        let (position_ms, duration_ms) = {
            let mut lanes = self.core.lanes.write().await;
            {
                let (active, inactive) = lanes.pair_mut();
                active.transport_mut().pause();
                active.release();
                active.graph_mut().gain_mut().set(1.0);
                // Ramp has completed; collapse it to a plain unity gain
                inactive.graph_mut().gain_mut().set(1.0);
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
        self.core.emit(PlayerEvent::CrossfadeCompleted {
            track_id: next_track,
            timestamp: now(),
        });

        self.core.persist_position().await;

        self.clear_guard();
        self.core.settle.lock().unwrap().take();
        info!("Crossfade completed, now playing {}", next_track);
    }

    fn clear_guard(&self) {
        *self.core.transition.lock().unwrap() = TransitionState::Idle;
    }
}
