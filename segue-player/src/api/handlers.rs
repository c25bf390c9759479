//! HTTP request handlers
//!
//! Thin mappings from REST endpoints to engine commands. Invalid indices
//! and unknown ids are no-ops by engine contract, so most handlers only
//! fail on storage errors.

use crate::api::AppContext;
use crate::playback::engine::LaneDiagnostics;
use crate::playback::queue::QueuePosition;
use crate::state::PlaybackSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use segue_common::params::{PlayerPrefs, RepeatMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::error;
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    position_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PlayTrackRequest {
    track_id: Uuid,
    /// Optional replacement queue; must contain `track_id` to take effect
    queue: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    /// 0-100 user-facing scale, converted to 0.0-1.0 internally
    volume: u8,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    rate: f32,
}

#[derive(Debug, Deserialize)]
pub struct ShuffleRequest {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct RepeatRequest {
    mode: String,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueTrack {
    /// Stable id; generated when omitted
    track_id: Option<Uuid>,
    /// File path relative to the library root (or absolute)
    file_path: PathBuf,
    /// Duration from the library's metadata layer
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    tracks: Vec<EnqueueTrack>,
    #[serde(default = "default_position")]
    position: QueuePosition,
}

fn default_position() -> QueuePosition {
    QueuePosition::End
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    status: String,
    track_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    from: usize,
    to: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    queue: Vec<Uuid>,
    current_track_id: Option<Uuid>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "segue-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_state(State(ctx): State<AppContext>) -> Json<PlaybackSnapshot> {
    Json(ctx.engine.snapshot().await)
}

pub async fn get_lanes(State(ctx): State<AppContext>) -> Json<LaneDiagnostics> {
    Json(ctx.engine.lane_diagnostics().await)
}

pub async fn play(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.play().await.map_err(internal)?;
    Ok(ok())
}

pub async fn pause(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.pause().await.map_err(internal)?;
    Ok(ok())
}

pub async fn toggle_play(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.toggle_play().await.map_err(internal)?;
    Ok(ok())
}

pub async fn next(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.next().await.map_err(internal)?;
    Ok(ok())
}

pub async fn previous(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.previous().await.map_err(internal)?;
    Ok(ok())
}

pub async fn seek(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.seek_to(req.position_ms).await.map_err(internal)?;
    Ok(ok())
}

pub async fn play_track(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayTrackRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine
        .play_track(req.track_id, req.queue)
        .await
        .map_err(internal)?;
    Ok(ok())
}

pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let volume = f32::from(req.volume.min(100)) / 100.0;
    ctx.engine.set_volume(volume).await.map_err(internal)?;
    Ok(ok())
}

pub async fn set_rate(
    State(ctx): State<AppContext>,
    Json(req): Json<RateRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.set_playback_rate(req.rate).await.map_err(internal)?;
    Ok(ok())
}

pub async fn set_shuffle(
    State(ctx): State<AppContext>,
    Json(req): Json<ShuffleRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.set_shuffle(req.enabled).await.map_err(internal)?;
    Ok(ok())
}

pub async fn set_repeat(
    State(ctx): State<AppContext>,
    Json(req): Json<RepeatRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let mode = RepeatMode::parse(&req.mode).ok_or(StatusCode::BAD_REQUEST)?;
    ctx.engine.set_repeat(mode).await.map_err(internal)?;
    Ok(ok())
}

pub async fn get_queue(State(ctx): State<AppContext>) -> Json<QueueResponse> {
    let snapshot = ctx.engine.snapshot().await;
    Json(QueueResponse {
        queue: snapshot.queue,
        current_track_id: snapshot.current_track_id,
    })
}

/// Register the tracks with the resolver and append them to the queue
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, StatusCode> {
    let mut track_ids = Vec::with_capacity(req.tracks.len());

    for track in req.tracks {
        let track_id = track.track_id.unwrap_or_else(Uuid::new_v4);
        ctx.resolver
            .register(track_id, track.file_path, track.duration_ms)
            .await;
        track_ids.push(track_id);
    }

    ctx.engine
        .add_to_queue(track_ids.clone(), req.position)
        .await
        .map_err(internal)?;

    Ok(Json(EnqueueResponse {
        status: "enqueued".to_string(),
        track_ids,
    }))
}

pub async fn reorder_queue(
    State(ctx): State<AppContext>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine
        .reorder_queue(req.from, req.to)
        .await
        .map_err(internal)?;
    Ok(ok())
}

pub async fn clear_queue(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.clear_queue().await.map_err(internal)?;
    Ok(ok())
}

pub async fn remove_from_queue(
    State(ctx): State<AppContext>,
    Path(track_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.remove_from_queue(track_id).await.map_err(internal)?;
    Ok(ok())
}

pub async fn get_settings(State(ctx): State<AppContext>) -> Json<PlayerPrefs> {
    Json(ctx.engine.prefs().await)
}

pub async fn set_settings(
    State(ctx): State<AppContext>,
    Json(prefs): Json<PlayerPrefs>,
) -> Result<Json<StatusResponse>, StatusCode> {
    ctx.engine.apply_settings(prefs).await.map_err(internal)?;
    Ok(ok())
}

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

fn internal(e: crate::error::Error) -> StatusCode {
    error!("Request failed: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}
