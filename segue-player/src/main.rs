//! Segue player - main entry point
//!
//! Starts the dual-lane playback engine and its HTTP/SSE control surface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use segue_player::api::{self, AppContext};
use segue_player::config::Config;
use segue_player::db::init::init_db;
use segue_player::playback::PlayerEngine;
use segue_player::resolver::{RegistryResolver, ResourceResolver};

/// Command-line arguments for segue-player
#[derive(Parser, Debug)]
#[command(name = "segue-player")]
#[command(about = "Dual-lane playback engine for Segue")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "SEGUE_PORT")]
    port: u16,

    /// Path to the settings database
    #[arg(short, long, env = "SEGUE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Root folder containing music files
    #[arg(short, long, env = "SEGUE_LIBRARY_ROOT")]
    library_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "segue_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::resolve(args.port, args.db_path, args.library_root)
        .context("Failed to resolve configuration")?;

    info!("Starting Segue player on {}", config.bind_addr);
    info!("Library root: {}", config.library_root.display());

    let db = init_db(&config.db_path)
        .await
        .context("Failed to initialize database")?;

    let resolver = Arc::new(RegistryResolver::new(config.library_root.clone()));

    let engine = PlayerEngine::new(db, Arc::clone(&resolver) as Arc<dyn ResourceResolver>)
        .await
        .context("Failed to initialize playback engine")?;
    engine.start().await.context("Failed to start playback engine")?;
    info!("Playback engine started");

    let ctx = AppContext {
        engine: engine.clone(),
        resolver,
    };

    api::run(&config.bind_addr, ctx, shutdown_signal())
        .await
        .context("Server error")?;

    engine.stop().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
