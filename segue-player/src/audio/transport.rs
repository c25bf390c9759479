//! Per-lane playback clock
//!
//! Tracks media position for one lane: play/pause/seek/rate against a
//! monotonic anchor. Uses `tokio::time::Instant` so look-ahead math and
//! gain ramps run on the same clock, and tests can drive virtual time.

use std::time::Duration;
use tokio::time::Instant;

/// Playback transport for one lane
#[derive(Debug, Clone)]
pub struct Transport {
    playing: bool,
    rate: f64,
    /// Media position at the last anchor point
    base: Duration,
    /// Monotonic instant the base position was anchored at
    anchor: Instant,
    /// Media duration of the assigned resource
    duration: Option<Duration>,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            playing: false,
            rate: 1.0,
            base: Duration::ZERO,
            anchor: Instant::now(),
            duration: None,
        }
    }

    /// Assign the duration of a newly loaded resource and rewind to zero
    pub fn load(&mut self, duration: Duration) {
        self.duration = Some(duration);
        self.base = Duration::ZERO;
        self.anchor = Instant::now();
        self.playing = false;
    }

    /// Clear the transport when its resource is released
    pub fn unload(&mut self) {
        self.duration = None;
        self.base = Duration::ZERO;
        self.anchor = Instant::now();
        self.playing = false;
    }

    /// Current media position, clamped to the duration
    pub fn position(&self) -> Duration {
        let raw = if self.playing {
            self.base + self.anchor.elapsed().mul_f64(self.rate)
        } else {
            self.base
        };

        match self.duration {
            Some(d) => raw.min(d),
            None => raw,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.anchor = Instant::now();
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.base = self.position();
            self.playing = false;
        }
    }

    /// Jump to a media position, clamped to [0, duration]
    pub fn seek(&mut self, position: Duration) {
        let clamped = match self.duration {
            Some(d) => position.min(d),
            None => position,
        };
        self.base = clamped;
        self.anchor = Instant::now();
    }

    /// Change the playback rate without moving the media position
    pub fn set_rate(&mut self, rate: f64) {
        self.base = self.position();
        self.anchor = Instant::now();
        self.rate = rate;
    }

    /// Whether the media position has reached the end of the resource
    pub fn ended(&self) -> bool {
        match self.duration {
            Some(d) => self.position() >= d,
            None => false,
        }
    }

    /// Media time remaining, None when no resource is loaded
    pub fn remaining(&self) -> Option<Duration> {
        self.duration.map(|d| d.saturating_sub(self.position()))
    }

    /// Wall-clock time until the end of the resource at the current rate
    pub fn remaining_wall(&self) -> Option<Duration> {
        self.remaining().map(|r| {
            if self.rate > 0.0 {
                r.div_f64(self.rate)
            } else {
                r
            }
        })
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration as TokioDuration};

    #[tokio::test(start_paused = true)]
    async fn test_position_advances_while_playing() {
        let mut transport = Transport::new();
        transport.load(Duration::from_secs(10));
        transport.play();

        advance(TokioDuration::from_secs(3)).await;
        assert_eq!(transport.position(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_frozen_while_paused() {
        let mut transport = Transport::new();
        transport.load(Duration::from_secs(10));
        transport.play();

        advance(TokioDuration::from_secs(2)).await;
        transport.pause();

        advance(TokioDuration::from_secs(5)).await;
        assert_eq!(transport.position(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_scales_position() {
        let mut transport = Transport::new();
        transport.load(Duration::from_secs(10));
        transport.set_rate(2.0);
        transport.play();

        advance(TokioDuration::from_secs(2)).await;
        assert_eq!(transport.position(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_clamped_at_duration() {
        let mut transport = Transport::new();
        transport.load(Duration::from_secs(3));
        transport.play();

        advance(TokioDuration::from_secs(10)).await;
        assert_eq!(transport.position(), Duration::from_secs(3));
        assert!(transport.ended());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_clamps_to_duration() {
        let mut transport = Transport::new();
        transport.load(Duration::from_secs(5));

        transport.seek(Duration::from_secs(30));
        assert_eq!(transport.position(), Duration::from_secs(5));

        transport.seek(Duration::from_secs(2));
        assert_eq!(transport.position(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_wall_accounts_for_rate() {
        let mut transport = Transport::new();
        transport.load(Duration::from_secs(10));
        transport.set_rate(2.0);
        transport.play();

        advance(TokioDuration::from_secs(1)).await;
        // 8s of media left, at 2x that is 4s of wall clock
        assert_eq!(transport.remaining(), Some(Duration::from_secs(8)));
        assert_eq!(transport.remaining_wall(), Some(Duration::from_secs(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_without_duration_is_false() {
        let transport = Transport::new();
        assert!(!transport.ended());
        assert_eq!(transport.remaining(), None);
    }
}
