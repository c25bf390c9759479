//! # Segue Common Library
//!
//! Shared vocabulary for the Segue playback engine:
//! - Event types (PlayerEvent enum)
//! - Fade curve definitions and calculations
//! - Playback parameter types (EQ bands, repeat mode, preferences)
//! - Utility functions

pub mod error;
pub mod events;
pub mod fade_curves;
pub mod params;
pub mod time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
pub use params::{EqBand, PlayerPrefs, RepeatMode};
