//! Event types for the Segue event system
//!
//! Every state change the engine makes is announced on a broadcast channel
//! as one of these events; the SSE endpoint relays them to UI clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Segue player event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playing/paused flipped
    PlaybackStateChanged {
        playing: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track started playing from the top
    TrackStarted {
        track_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current track changed (skip, crossfade, or gapless switch)
    TrackChanged {
        track_id: Option<Uuid>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic position update while playing
    PlaybackProgress {
        track_id: Uuid,
        position_ms: u64,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed (notification only)
    QueueChanged {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Master volume changed
    VolumeChanged {
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate changed
    RateChanged {
        rate: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A crossfade between two tracks began
    CrossfadeStarted {
        from_track_id: Uuid,
        to_track_id: Uuid,
        fade_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A crossfade finished and the lanes swapped
    CrossfadeCompleted {
        track_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The next track was preloaded into the idle lane
    TrackPreloaded {
        track_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current track could not be resolved to a playable resource
    TrackUnplayable {
        track_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event name used as the SSE `event:` field
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged { .. } => "playback_state_changed",
            PlayerEvent::TrackStarted { .. } => "track_started",
            PlayerEvent::TrackChanged { .. } => "track_changed",
            PlayerEvent::PlaybackProgress { .. } => "playback_progress",
            PlayerEvent::QueueChanged { .. } => "queue_changed",
            PlayerEvent::VolumeChanged { .. } => "volume_changed",
            PlayerEvent::RateChanged { .. } => "rate_changed",
            PlayerEvent::CrossfadeStarted { .. } => "crossfade_started",
            PlayerEvent::CrossfadeCompleted { .. } => "crossfade_completed",
            PlayerEvent::TrackPreloaded { .. } => "track_preloaded",
            PlayerEvent::TrackUnplayable { .. } => "track_unplayable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tags_type() {
        let event = PlayerEvent::VolumeChanged {
            volume: 0.5,
            timestamp: crate::time::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"VolumeChanged\""));
        assert!(json.contains("\"volume\":0.5"));
    }

    #[test]
    fn test_event_names_are_snake_case() {
        let event = PlayerEvent::CrossfadeStarted {
            from_track_id: Uuid::new_v4(),
            to_track_id: Uuid::new_v4(),
            fade_ms: 2000,
            timestamp: crate::time::now(),
        };
        assert_eq!(event.name(), "crossfade_started");
    }
}
