//! Resource resolution
//!
//! The engine never touches files or decoders directly; it asks a
//! `ResourceResolver` to turn a track id into a playable `ResourceHandle`.
//! Resolution is async and may be slow or fail; a `None` result aborts
//! only the transition that requested it, never playback itself.
//!
//! A handle is acquired exactly when assigned to a lane and released
//! exactly once when superseded or the lane is torn down; the release hook
//! runs on drop, so reassignment cannot leak or double-release.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// A playable resource bound to one track
pub struct ResourceHandle {
    track_id: Uuid,
    path: PathBuf,
    duration: Duration,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ResourceHandle {
    pub fn new(track_id: Uuid, path: PathBuf, duration: Duration) -> Self {
        Self {
            track_id,
            path,
            duration,
            release: None,
        }
    }

    /// Attach a hook that runs exactly once when the handle is released
    pub fn with_release(mut self, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn track_id(&self) -> Uuid {
        self.track_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("track_id", &self.track_id)
            .field("path", &self.path)
            .field("duration", &self.duration)
            .finish()
    }
}

/// Resolves track ids to playable resources
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Resolve a track to a handle, or `None` when it cannot be played
    /// (unknown id, file moved, permission revoked)
    async fn resolve(&self, track_id: Uuid) -> Result<Option<ResourceHandle>>;
}

/// A track registered with the resolver
#[derive(Debug, Clone)]
struct RegisteredTrack {
    path: PathBuf,
    duration: Duration,
}

/// Registry-backed resolver: tracks are registered (id → path + duration)
/// at enqueue time and resolved against the library root on demand.
pub struct RegistryResolver {
    library_root: PathBuf,
    entries: RwLock<HashMap<Uuid, RegisteredTrack>>,
}

impl RegistryResolver {
    pub fn new(library_root: PathBuf) -> Self {
        Self {
            library_root,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or re-register) a track's location and duration
    pub async fn register(&self, track_id: Uuid, path: PathBuf, duration_ms: u64) {
        let track = RegisteredTrack {
            path,
            duration: Duration::from_millis(duration_ms),
        };
        self.entries.write().await.insert(track_id, track);
    }

    /// Forget a track
    pub async fn unregister(&self, track_id: Uuid) {
        self.entries.write().await.remove(&track_id);
    }
}

#[async_trait]
impl ResourceResolver for RegistryResolver {
    async fn resolve(&self, track_id: Uuid) -> Result<Option<ResourceHandle>> {
        let Some(track) = self.entries.read().await.get(&track_id).cloned() else {
            debug!("Track {} not registered", track_id);
            return Ok(None);
        };

        let full_path = if track.path.is_absolute() {
            track.path.clone()
        } else {
            self.library_root.join(&track.path)
        };

        // A file that moved or lost permissions fails the transition, not
        // playback
        match tokio::fs::metadata(&full_path).await {
            Ok(_) => Ok(Some(ResourceHandle::new(
                track_id,
                full_path,
                track.duration,
            ))),
            Err(e) => {
                warn!("Track {} unreadable at {}: {}", track_id, full_path.display(), e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_release_hook_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);

        let handle = ResourceHandle::new(
            Uuid::new_v4(),
            PathBuf::from("a.flac"),
            Duration::from_secs(180),
        )
        .with_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(handle);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_track_resolves_none() {
        let resolver = RegistryResolver::new(PathBuf::from("/tmp"));
        let result = resolver.resolve(Uuid::new_v4()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_registered_track_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("song.flac");
        std::fs::write(&file_path, b"data").unwrap();

        let resolver = RegistryResolver::new(dir.path().to_path_buf());
        let track_id = Uuid::new_v4();
        resolver
            .register(track_id, PathBuf::from("song.flac"), 180_000)
            .await;

        let handle = resolver.resolve(track_id).await.unwrap().unwrap();
        assert_eq!(handle.track_id(), track_id);
        assert_eq!(handle.duration(), Duration::from_millis(180_000));
        assert_eq!(handle.path(), file_path);
    }

    #[tokio::test]
    async fn test_moved_file_resolves_none() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = RegistryResolver::new(dir.path().to_path_buf());

        let track_id = Uuid::new_v4();
        resolver
            .register(track_id, PathBuf::from("gone.flac"), 1_000)
            .await;

        let result = resolver.resolve(track_id).await.unwrap();
        assert!(result.is_none());
    }
}
