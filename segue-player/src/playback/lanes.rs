//! Lane management
//!
//! Exactly two playback lanes (A/B), each owning its transport, node graph,
//! and at most one resource handle. The manager is the only component that
//! touches lane internals; "active" is a key flip, never a data copy.

use crate::audio::{LaneGraph, Transport};
use crate::resolver::ResourceHandle;
use uuid::Uuid;

/// One of the two playback lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum LaneKey {
    A,
    B,
}

impl LaneKey {
    /// The opposite lane
    pub fn other(self) -> LaneKey {
        match self {
            LaneKey::A => LaneKey::B,
            LaneKey::B => LaneKey::A,
        }
    }

    fn index(self) -> usize {
        match self {
            LaneKey::A => 0,
            LaneKey::B => 1,
        }
    }
}

impl std::fmt::Display for LaneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaneKey::A => write!(f, "A"),
            LaneKey::B => write!(f, "B"),
        }
    }
}

/// A playback lane: transport clock, node graph, assigned resource
#[derive(Debug)]
pub struct Lane {
    key: LaneKey,
    transport: Transport,
    graph: LaneGraph,
    handle: Option<ResourceHandle>,
}

impl Lane {
    fn new(key: LaneKey) -> Self {
        Self {
            key,
            transport: Transport::new(),
            graph: LaneGraph::new(),
            handle: None,
        }
    }

    pub fn key(&self) -> LaneKey {
        self.key
    }

    /// Assign a resource, releasing the previous handle first.
    ///
    /// The transport is loaded with the new duration and rewound to zero.
    pub fn assign(&mut self, handle: ResourceHandle) {
        // Dropping the old handle runs its release hook before the new
        // resource takes the slot
        self.handle.take();
        self.transport.load(handle.duration());
        self.handle = Some(handle);
    }

    /// Release the assigned resource and clear the transport
    pub fn release(&mut self) {
        self.handle.take();
        self.transport.unload();
    }

    pub fn track_id(&self) -> Option<Uuid> {
        self.handle.as_ref().map(|h| h.track_id())
    }

    pub fn has_resource(&self) -> bool {
        self.handle.is_some()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn graph(&self) -> &LaneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut LaneGraph {
        &mut self.graph
    }
}

/// Owner of the two lanes and the active pointer
#[derive(Debug)]
pub struct LaneManager {
    lanes: [Option<Lane>; 2],
    active: LaneKey,
    master_gain: f32,
}

impl LaneManager {
    pub fn new() -> Self {
        Self {
            lanes: [None, None],
            active: LaneKey::A,
            master_gain: 1.0,
        }
    }

    /// Create-or-return a lane; the first call per key allocates its graph
    pub fn ensure_lane(&mut self, key: LaneKey) -> &mut Lane {
        let slot = &mut self.lanes[key.index()];
        slot.get_or_insert_with(|| Lane::new(key))
    }

    /// Look at a lane without allocating it
    pub fn lane(&self, key: LaneKey) -> Option<&Lane> {
        self.lanes[key.index()].as_ref()
    }

    pub fn lane_mut(&mut self, key: LaneKey) -> Option<&mut Lane> {
        self.lanes[key.index()].as_mut()
    }

    pub fn active_key(&self) -> LaneKey {
        self.active
    }

    pub fn inactive_key(&self) -> LaneKey {
        self.active.other()
    }

    /// The active lane (allocated on demand)
    pub fn active_lane(&mut self) -> &mut Lane {
        self.ensure_lane(self.active)
    }

    /// The inactive lane (allocated on demand)
    pub fn inactive_lane(&mut self) -> &mut Lane {
        self.ensure_lane(self.active.other())
    }

    /// Both lanes at once, (active, inactive), for dual-lane transitions
    pub fn pair_mut(&mut self) -> (&mut Lane, &mut Lane) {
        self.ensure_lane(LaneKey::A);
        self.ensure_lane(LaneKey::B);

        let (first, second) = self.lanes.split_at_mut(1);
        let a = first[0].as_mut().expect("lane A ensured above");
        let b = second[0].as_mut().expect("lane B ensured above");

        match self.active {
            LaneKey::A => (a, b),
            LaneKey::B => (b, a),
        }
    }

    /// Flip which lane is active.
    ///
    /// Never starts or stops playback itself; callers pause the outgoing
    /// lane and start the incoming one as part of the same transition.
    pub fn swap(&mut self) {
        self.active = self.active.other();
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
    }

    /// Release both lanes' resources (teardown / clear-queue)
    pub fn release_all(&mut self) {
        for slot in self.lanes.iter_mut() {
            if let Some(lane) = slot.as_mut() {
                lane.release();
            }
        }
    }
}

impl Default for LaneManager {
    fn default() -> Self {
        Self::new()
    }
}
