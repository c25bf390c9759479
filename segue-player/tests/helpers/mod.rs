//! Shared test helpers: scripted resolver and engine setup
#![allow(dead_code)]

use async_trait::async_trait;
use segue_player::error::Result;
use segue_player::playback::PlayerEngine;
use segue_player::resolver::{ResourceHandle, ResourceResolver};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Run a DB-touching setup future under a momentarily-live virtual clock.
///
/// All integration tests run with `start_paused = true`. Under a paused
/// clock the idle runtime auto-advances virtual time to the sqlx pool's
/// acquire timeout during connection establishment, spuriously failing
/// with `PoolTimedOut`. Resuming real time for the duration of setup lets
/// the connection establish, then re-freezes the clock for the
/// deterministic timing assertions that follow. Callers must already be
/// under a paused clock.
async fn with_live_clock<F: Future>(f: F) -> F::Output {
    tokio::time::resume();
    let out = f.await;
    tokio::time::pause();
    out
}

static MEM_DB_SEQ: AtomicU64 = AtomicU64::new(0);

/// A fresh in-memory database for a test, safe to use under a paused clock.
///
/// Mirrors `init_memory_db`'s schema, but backed by a shared-cache in-memory
/// database with several eagerly-opened connections. The engine's background
/// loops (tick, crossfade, preload) all persist concurrently; with the
/// single-connection pool of `init_memory_db`, a persist that had to wait for
/// the connection would — under the paused test clock — auto-advance virtual
/// time to the pool's acquire timeout, corrupting the timing assertions.
/// Pre-warmed, multi-connection, and unique per call so tests stay isolated.
pub async fn fresh_memory_db() -> Pool<Sqlite> {
    with_live_clock(build_memory_db()).await
}

async fn build_memory_db() -> Pool<Sqlite> {
    let id = MEM_DB_SEQ.fetch_add(1, Ordering::Relaxed);
    let url = format!("sqlite:file:segue_test_mem_{id}?mode=memory&cache=shared");
    let options = SqliteConnectOptions::from_str(&url).unwrap();

    let pool = SqlitePoolOptions::new()
        .min_connections(8)
        .max_connections(8)
        .connect_with(options)
        .await
        .unwrap();

    // Force every connection open now (while the clock is live) so that no
    // acquire during the test ever has to wait on connection establishment.
    let mut held = Vec::new();
    for _ in 0..8 {
        held.push(pool.acquire().await.unwrap());
    }
    drop(held);

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

/// Scripted resolver: per-track durations, fail sets, and bookkeeping for
/// leak and invocation assertions
pub struct MockResolver {
    durations: Mutex<HashMap<Uuid, u64>>,
    failing: Mutex<HashSet<Uuid>>,
    resolve_counts: Mutex<HashMap<Uuid, usize>>,
    live_handles: Arc<AtomicUsize>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self {
            durations: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            resolve_counts: Mutex::new(HashMap::new()),
            live_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Register a resolvable track with the given duration
    pub fn add_track(&self, track_id: Uuid, duration_ms: u64) {
        self.durations.lock().unwrap().insert(track_id, duration_ms);
    }

    /// Make a track fail resolution until `unfail` is called
    pub fn fail(&self, track_id: Uuid) {
        self.failing.lock().unwrap().insert(track_id);
    }

    pub fn unfail(&self, track_id: Uuid) {
        self.failing.lock().unwrap().remove(&track_id);
    }

    /// How many times `resolve` was called for this track
    pub fn resolve_count(&self, track_id: Uuid) -> usize {
        self.resolve_counts
            .lock()
            .unwrap()
            .get(&track_id)
            .copied()
            .unwrap_or(0)
    }

    /// Handles currently held somewhere in the engine
    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceResolver for MockResolver {
    async fn resolve(&self, track_id: Uuid) -> Result<Option<ResourceHandle>> {
        *self
            .resolve_counts
            .lock()
            .unwrap()
            .entry(track_id)
            .or_insert(0) += 1;

        if self.failing.lock().unwrap().contains(&track_id) {
            return Ok(None);
        }
        let Some(duration_ms) = self.durations.lock().unwrap().get(&track_id).copied() else {
            return Ok(None);
        };

        self.live_handles.fetch_add(1, Ordering::SeqCst);
        let live = Arc::clone(&self.live_handles);

        Ok(Some(
            ResourceHandle::new(
                track_id,
                PathBuf::from(format!("{track_id}.flac")),
                Duration::from_millis(duration_ms),
            )
            .with_release(move || {
                live.fetch_sub(1, Ordering::SeqCst);
            }),
        ))
    }
}

/// An engine wired to a fresh in-memory database and a mock resolver
pub struct TestPlayer {
    pub engine: PlayerEngine,
    pub resolver: Arc<MockResolver>,
    pub db: Pool<Sqlite>,
}

/// Build and start an engine over the given `(track, duration_ms)` script
pub async fn start_player(tracks: &[(Uuid, u64)]) -> TestPlayer {
    let db = fresh_memory_db().await;
    start_player_with_db(db, tracks).await
}

/// Same, but against an existing database (restart scenarios)
pub async fn start_player_with_db(db: Pool<Sqlite>, tracks: &[(Uuid, u64)]) -> TestPlayer {
    let resolver = Arc::new(MockResolver::new());
    for (track_id, duration_ms) in tracks {
        resolver.add_track(*track_id, *duration_ms);
    }

    let engine = with_live_clock(PlayerEngine::new(
        db.clone(),
        Arc::clone(&resolver) as Arc<dyn ResourceResolver>,
    ))
    .await
    .unwrap();
    // start() restores the persisted position (a DB read) before spawning
    // the background loops; run that read under a live clock too. The
    // spawned loops only begin after start() returns, so they still run on
    // the frozen clock the timing assertions depend on.
    with_live_clock(engine.start()).await.unwrap();

    TestPlayer {
        engine,
        resolver,
        db,
    }
}

/// Fresh track ids
pub fn track_ids(n: usize) -> Vec<Uuid> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}
