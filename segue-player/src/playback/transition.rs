//! Transition guard
//!
//! The single source of truth for lane-swap transitions. The crossfade
//! scheduler, the gapless preloader, and the natural end-of-track path all
//! consult this one state, which is what enforces at most one transition
//! per track boundary: a hard switch never starts while a fade is in
//! flight, and the natural `ended` event is suppressed while `Fading`.

use crate::playback::lanes::LaneKey;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

/// Per-track-boundary transition state: Idle → Scheduled → Fading → Idle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionState {
    /// No transition pending
    Idle,

    /// A crossfade timer is armed; re-arming replaces `fire_at`
    Scheduled { next_track: Uuid, fire_at: Instant },

    /// A crossfade is in flight; the outgoing lane's natural `ended` event
    /// must be ignored until this clears
    Fading {
        next_track: Uuid,
        outgoing: LaneKey,
    },
}

impl TransitionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TransitionState::Idle)
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, TransitionState::Scheduled { .. })
    }

    pub fn is_fading(&self) -> bool {
        matches!(self, TransitionState::Fading { .. })
    }

    /// The armed timer deadline, when `Scheduled`
    pub fn fire_at(&self) -> Option<Instant> {
        match self {
            TransitionState::Scheduled { fire_at, .. } => Some(*fire_at),
            _ => None,
        }
    }
}

/// Guard shared between the schedulers and the orchestrator.
///
/// A std mutex: critical sections are short and never held across awaits.
pub type SharedTransition = Arc<Mutex<TransitionState>>;

/// New guard in the `Idle` state
pub fn shared_transition() -> SharedTransition {
    Arc::new(Mutex::new(TransitionState::Idle))
}
