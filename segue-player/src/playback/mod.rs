//! Playback engine components

pub mod crossfade;
pub mod engine;
pub mod eq;
pub mod lanes;
pub mod preload;
pub mod queue;
pub mod transition;

pub use engine::PlayerEngine;
pub use lanes::{Lane, LaneKey, LaneManager};
pub use queue::{QueuePosition, QueueState};
pub use transition::TransitionState;
