//! Playback parameter types
//!
//! Shared value types for the engine's reactive preferences: EQ bands,
//! repeat mode, and the transition/resume settings read from the settings
//! store. Bounds used by the command surface live here so every consumer
//! clamps the same way.

use crate::fade_curves::FadeCurve;
use serde::{Deserialize, Serialize};

/// Minimum accepted playback rate
pub const MIN_PLAYBACK_RATE: f32 = 0.25;
/// Maximum accepted playback rate
pub const MAX_PLAYBACK_RATE: f32 = 2.0;

/// Look-ahead poll cadence for the crossfade scheduler and gapless preloader
pub const LOOKAHEAD_POLL_MS: u64 = 500;
/// Trailing window in which the next track is preloaded for gapless playback
pub const PRELOAD_WINDOW_MS: u64 = 4000;
/// Settle delay after a fade completes before the lanes swap
pub const FADE_SETTLE_MS: u64 = 100;

/// One peaking EQ filter: frequency, gain, and quality factor.
///
/// A band list defines the filter chain attached in series to each lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    /// Center frequency in Hz
    pub frequency_hz: f32,
    /// Gain in dB (positive = boost, negative = cut)
    pub gain_db: f32,
    /// Quality factor (bandwidth); 0.707 ≈ one octave, higher = narrower
    pub q: f32,
}

impl EqBand {
    pub fn new(frequency_hz: f32, gain_db: f32, q: f32) -> Self {
        Self {
            frequency_hz,
            gain_db,
            q,
        }
    }
}

/// Repeat behavior at the end of a track or queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Stop at the end of the queue
    #[default]
    Off,
    /// Wrap to the first queue entry after the last
    Queue,
    /// Replay the current track in place
    Track,
}

impl RepeatMode {
    /// Parse from the settings-store string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" => Some(RepeatMode::Off),
            "queue" => Some(RepeatMode::Queue),
            "track" => Some(RepeatMode::Track),
            _ => None,
        }
    }

    /// Canonical settings-store string
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::Queue => "queue",
            RepeatMode::Track => "track",
        }
    }
}

impl std::str::FromStr for RepeatMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::error::Error::Parse(format!("unknown repeat mode '{s}'")))
    }
}

/// Reactive player preferences.
///
/// Read from the settings store at startup and re-applied live on change;
/// none of these require restarting the active track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerPrefs {
    /// Resume playing on startup if the persisted record says so
    pub resume_on_load: bool,

    /// Crossfade consecutive tracks; mutually exclusive with gapless preload
    pub crossfade_enabled: bool,
    /// Crossfade duration in milliseconds
    pub crossfade_ms: u64,
    /// Curve shape for the fade ramps
    pub fade_curve: FadeCurve,

    /// Preload the next track for a hard, silent switch at track end
    pub gapless_enabled: bool,

    /// Apply the EQ filter stage to both lanes
    pub eq_enabled: bool,
    /// Band list attached in series when EQ is enabled
    pub eq_bands: Vec<EqBand>,
}

impl Default for PlayerPrefs {
    fn default() -> Self {
        Self {
            resume_on_load: false,
            crossfade_enabled: false,
            crossfade_ms: 2000,
            fade_curve: FadeCurve::Linear,
            gapless_enabled: true,
            eq_enabled: false,
            eq_bands: Vec::new(),
        }
    }
}

impl PlayerPrefs {
    /// Crossfade takes precedence over gapless when both are flagged on
    pub fn gapless_active(&self) -> bool {
        self.gapless_enabled && !self.crossfade_enabled
    }
}

/// Clamp a volume to the accepted [0.0, 1.0] range
pub fn clamp_volume(volume: f32) -> f32 {
    volume.clamp(0.0, 1.0)
}

/// Clamp a playback rate to the accepted [0.25, 2.0] range
pub fn clamp_rate(rate: f32) -> f32 {
    rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_mode_round_trip() {
        for mode in [RepeatMode::Off, RepeatMode::Queue, RepeatMode::Track] {
            assert_eq!(RepeatMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(RepeatMode::parse("forever"), None);
    }

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(0.5), 0.5);
        assert_eq!(clamp_volume(1.5), 1.0);
        assert_eq!(clamp_volume(-0.1), 0.0);
    }

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(1.0), 1.0);
        assert_eq!(clamp_rate(0.1), MIN_PLAYBACK_RATE);
        assert_eq!(clamp_rate(3.0), MAX_PLAYBACK_RATE);
    }

    #[test]
    fn test_crossfade_overrides_gapless() {
        let prefs = PlayerPrefs {
            crossfade_enabled: true,
            gapless_enabled: true,
            ..Default::default()
        };
        assert!(!prefs.gapless_active());

        let prefs = PlayerPrefs {
            crossfade_enabled: false,
            gapless_enabled: true,
            ..Default::default()
        };
        assert!(prefs.gapless_active());
    }

    #[test]
    fn test_eq_bands_serialize_as_json() {
        let bands = vec![EqBand::new(100.0, 3.0, 0.707), EqBand::new(1000.0, -2.0, 1.4)];
        let json = serde_json::to_string(&bands).unwrap();
        let parsed: Vec<EqBand> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, bands);
    }
}
