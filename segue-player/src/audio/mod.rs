//! Lane audio primitives
//!
//! The per-lane transport clock and the node graph the EQ builder and
//! crossfade scheduler rewire. Nothing here touches an output device;
//! decoded audio lives behind the resource resolver boundary.

pub mod graph;
pub mod transport;

pub use graph::{FilterNode, GainNode, LaneGraph, NodeRef};
pub use transport::Transport;

/// Working sample rate used for filter coefficient calculation
pub const WORKING_SAMPLE_RATE: f32 = 44_100.0;
