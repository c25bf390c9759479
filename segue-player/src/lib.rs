//! # Segue Player Library (segue-player)
//!
//! Dual-lane playback scheduling engine with crossfade and gapless
//! transitions.
//!
//! **Purpose:** Turn a queue of track identifiers into continuous,
//! gap-controlled, optionally crossfaded, EQ-shaped playback, persisting
//! enough state to resume after a restart, and expose playback state and
//! commands over HTTP/SSE.

pub mod api;
pub mod audio;
pub mod config;
pub mod db;
pub mod error;
pub mod playback;
pub mod resolver;
pub mod state;

pub use error::{Error, Result};
pub use playback::PlayerEngine;
pub use state::SharedState;
