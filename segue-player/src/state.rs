//! Shared playback state
//!
//! Thread-safe shared state for playback coordination between the
//! orchestrator, the look-ahead pollers, and the HTTP/SSE surface.

use segue_common::events::PlayerEvent;
use segue_common::params::RepeatMode;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Mutable playback status fields
#[derive(Debug, Clone)]
pub struct PlaybackStatus {
    /// Currently playing track (None if queue empty)
    pub current_track: Option<Uuid>,
    /// Whether playback is running
    pub is_playing: bool,
    /// Current position in milliseconds
    pub position_ms: u64,
    /// Total duration in milliseconds (None until a resource is loaded)
    pub duration_ms: Option<u64>,
    /// Master volume (0.0-1.0)
    pub volume: f32,
    /// Playback rate (0.25-2.0)
    pub playback_rate: f32,
    /// Shuffle flag
    pub shuffle: bool,
    /// Repeat mode
    pub repeat: RepeatMode,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            position_ms: 0,
            duration_ms: None,
            volume: 1.0,
            playback_rate: 1.0,
            shuffle: false,
            repeat: RepeatMode::Off,
        }
    }
}

/// Read-only snapshot exposed to the UI layer
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub current_track_id: Option<Uuid>,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub is_playing: bool,
    pub volume: f32,
    pub playback_rate: f32,
    pub queue: Vec<Uuid>,
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct SharedState {
    /// Current playback status
    pub status: RwLock<PlaybackStatus>,

    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<PlayerEvent>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            status: RwLock::new(PlaybackStatus::default()),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: PlayerEvent) {
        // Send errors mean no receivers, which is fine
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Get a copy of the current playback status
    pub async fn status(&self) -> PlaybackStatus {
        self.status.read().await.clone()
    }

    /// Whether playback is currently running
    pub async fn is_playing(&self) -> bool {
        self.status.read().await.is_playing
    }

    /// Current track id, if any
    pub async fn current_track(&self) -> Option<Uuid> {
        self.status.read().await.current_track
    }

    /// Build the UI-facing snapshot by joining status with the queue contents
    pub async fn snapshot(&self, queue: Vec<Uuid>) -> PlaybackSnapshot {
        let status = self.status.read().await;
        PlaybackSnapshot {
            current_track_id: status.current_track,
            position_ms: status.position_ms,
            duration_ms: status.duration_ms,
            is_playing: status.is_playing,
            volume: status.volume,
            playback_rate: status.playback_rate,
            queue,
            shuffle: status.shuffle,
            repeat: status.repeat,
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
