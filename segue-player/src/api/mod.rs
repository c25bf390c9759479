//! HTTP control surface
//!
//! Axum server exposing the orchestrator commands and the SSE event
//! stream. The UI itself lives elsewhere; this is the boundary it talks to.

pub mod handlers;
pub mod sse;

use crate::playback::PlayerEngine;
use crate::resolver::RegistryResolver;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: PlayerEngine,
    pub resolver: Arc<RegistryResolver>,
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(handlers::health))
        // Playback state
        .route("/playback/state", get(handlers::get_state))
        .route("/playback/lanes", get(handlers::get_lanes))
        // Playback control
        .route("/playback/play", post(handlers::play))
        .route("/playback/pause", post(handlers::pause))
        .route("/playback/toggle", post(handlers::toggle_play))
        .route("/playback/next", post(handlers::next))
        .route("/playback/previous", post(handlers::previous))
        .route("/playback/seek", post(handlers::seek))
        .route("/playback/play-track", post(handlers::play_track))
        .route("/playback/volume", post(handlers::set_volume))
        .route("/playback/rate", post(handlers::set_rate))
        .route("/playback/shuffle", post(handlers::set_shuffle))
        .route("/playback/repeat", post(handlers::set_repeat))
        // Queue management
        .route("/playback/queue", get(handlers::get_queue))
        .route("/playback/queue", post(handlers::enqueue))
        .route("/playback/queue/reorder", post(handlers::reorder_queue))
        .route("/playback/queue/clear", post(handlers::clear_queue))
        .route("/playback/queue/:track_id", delete(handlers::remove_from_queue))
        // Preferences
        .route("/settings", get(handlers::get_settings))
        .route("/settings", post(handlers::set_settings))
        // SSE event stream
        .route("/events", get(sse::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Run the HTTP API server until shutdown
pub async fn run(
    bind_addr: &str,
    ctx: AppContext,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> crate::error::Result<()> {
    let app = create_router(ctx);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| crate::error::Error::Http(format!("bind {}: {}", bind_addr, e)))?;

    info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::Http(e.to_string()))?;

    Ok(())
}
