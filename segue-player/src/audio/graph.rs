//! Per-lane audio node graph
//!
//! Each lane owns a chain `Source → [filter stage] → Gain → Output`. The
//! graph is an explicit edge set with idempotent connect/disconnect, so the
//! EQ builder can tear the filter stage down and rebuild it repeatedly
//! without dangling connections or duplicate edges.
//!
//! Gain changes can be scheduled as ramps evaluated lazily against the lane
//! clock, which is what keeps crossfades on the audio timeline instead of
//! wall-clock callbacks.

use biquad::{Coefficients, ToHertz, Type, Q_BUTTERWORTH_F32};
use segue_common::fade_curves::FadeCurve;
use segue_common::params::EqBand;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::Instant;

/// Addressable nodes within one lane's graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeRef {
    Source,
    Filter(usize),
    Gain,
    Output,
}

/// One peaking filter in the EQ stage
#[derive(Clone)]
pub struct FilterNode {
    band: EqBand,
    coefficients: Coefficients<f32>,
}

impl std::fmt::Debug for FilterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterNode").field("band", &self.band).finish()
    }
}

impl FilterNode {
    /// Build a peaking biquad for one band.
    ///
    /// Degenerate parameters fall back to unity coefficients rather than
    /// failing the whole stage rebuild.
    pub fn new(band: EqBand, sample_rate: f32) -> Self {
        let f0 = band.frequency_hz.clamp(20.0, sample_rate / 2.0 - 1.0);
        let q = if band.q > 0.0 { band.q } else { Q_BUTTERWORTH_F32 };

        let coefficients = Coefficients::<f32>::from_params(
            Type::PeakingEQ(band.gain_db),
            sample_rate.hz(),
            f0.hz(),
            q,
        )
        .unwrap_or_else(|_| unity_coeffs());

        Self {
            band,
            coefficients,
        }
    }

    pub fn band(&self) -> &EqBand {
        &self.band
    }

    pub fn coefficients(&self) -> &Coefficients<f32> {
        &self.coefficients
    }
}

/// Coefficients that pass audio unmodified
fn unity_coeffs() -> Coefficients<f32> {
    Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    }
}

/// An in-flight gain ramp between two levels
#[derive(Debug, Clone)]
struct GainRamp {
    from: f32,
    to: f32,
    start: Instant,
    end: Instant,
    curve: FadeCurve,
}

impl GainRamp {
    fn value_at(&self, now: Instant) -> f32 {
        if now <= self.start {
            return self.from;
        }
        if now >= self.end {
            return self.to;
        }

        let total = self.end.duration_since(self.start).as_secs_f32();
        let elapsed = now.duration_since(self.start).as_secs_f32();
        let t = (elapsed / total).clamp(0.0, 1.0);

        if self.to >= self.from {
            self.from + (self.to - self.from) * self.curve.fade_in(t)
        } else {
            self.to + (self.from - self.to) * self.curve.fade_out(t)
        }
    }
}

/// Gain node with lazily evaluated ramps
#[derive(Debug, Clone)]
pub struct GainNode {
    level: f32,
    ramp: Option<GainRamp>,
}

impl GainNode {
    pub fn new(level: f32) -> Self {
        Self { level, ramp: None }
    }

    /// Current gain value at `now`
    pub fn value_at(&self, now: Instant) -> f32 {
        match &self.ramp {
            Some(ramp) => ramp.value_at(now),
            None => self.level,
        }
    }

    /// Set the gain immediately, cancelling any ramp
    pub fn set(&mut self, level: f32) {
        self.level = level;
        self.ramp = None;
    }

    /// Schedule a ramp from the current value to `target` over `duration`
    pub fn ramp_to(&mut self, target: f32, now: Instant, duration: Duration, curve: FadeCurve) {
        let from = self.value_at(now);

        if duration.is_zero() {
            self.set(target);
            return;
        }

        self.level = target;
        self.ramp = Some(GainRamp {
            from,
            to: target,
            start: now,
            end: now + duration,
            curve,
        });
    }

    /// The level the node is heading toward (ramp target, or the set level)
    pub fn target(&self) -> f32 {
        self.level
    }

    /// Whether a ramp is still in progress at `now`
    pub fn is_ramping(&self, now: Instant) -> bool {
        self.ramp.as_ref().is_some_and(|r| now < r.end)
    }
}

/// One lane's node graph
#[derive(Debug, Clone)]
pub struct LaneGraph {
    filters: Vec<FilterNode>,
    gain: GainNode,
    edges: BTreeSet<(NodeRef, NodeRef)>,
}

impl LaneGraph {
    /// New graph wired straight through: source → gain → output
    pub fn new() -> Self {
        let mut graph = Self {
            filters: Vec::new(),
            gain: GainNode::new(1.0),
            edges: BTreeSet::new(),
        };
        graph.connect(NodeRef::Source, NodeRef::Gain);
        graph.connect(NodeRef::Gain, NodeRef::Output);
        graph
    }

    /// Add an edge; connecting an already-connected pair is a no-op
    pub fn connect(&mut self, from: NodeRef, to: NodeRef) -> bool {
        self.edges.insert((from, to))
    }

    /// Remove an edge; disconnecting an absent edge is a no-op
    pub fn disconnect(&mut self, from: NodeRef, to: NodeRef) -> bool {
        self.edges.remove(&(from, to))
    }

    /// Remove every edge touching `node`
    pub fn disconnect_node(&mut self, node: NodeRef) {
        self.edges.retain(|(a, b)| *a != node && *b != node);
    }

    pub fn has_edge(&self, from: NodeRef, to: NodeRef) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn filters(&self) -> &[FilterNode] {
        &self.filters
    }

    pub fn gain(&self) -> &GainNode {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut GainNode {
        &mut self.gain
    }

    /// Install a new filter stage, rewiring source → f1 → … → fn → gain.
    ///
    /// An empty stage wires source → gain directly (bypass). Safe to call
    /// repeatedly; the previous stage is fully disconnected first.
    pub fn set_filter_stage(&mut self, filters: Vec<FilterNode>) {
        // Tear down the old stage and the source→gain path
        for idx in 0..self.filters.len() {
            self.disconnect_node(NodeRef::Filter(idx));
        }
        self.disconnect(NodeRef::Source, NodeRef::Gain);
        self.filters = filters;

        if self.filters.is_empty() {
            self.connect(NodeRef::Source, NodeRef::Gain);
        } else {
            let mut upstream = NodeRef::Source;
            for idx in 0..self.filters.len() {
                self.connect(upstream, NodeRef::Filter(idx));
                upstream = NodeRef::Filter(idx);
            }
            self.connect(upstream, NodeRef::Gain);
        }
    }

    /// Walk the chain from the source, following single-successor edges.
    ///
    /// Used by tests and diagnostics to assert the wiring order.
    pub fn chain(&self) -> Vec<NodeRef> {
        let mut chain = vec![NodeRef::Source];
        let mut current = NodeRef::Source;

        loop {
            let next = self
                .edges
                .iter()
                .find(|(from, _)| *from == current)
                .map(|(_, to)| *to);

            match next {
                Some(node) => {
                    chain.push(node);
                    if node == NodeRef::Output {
                        break;
                    }
                    current = node;
                }
                None => break,
            }
        }

        chain
    }
}

impl Default for LaneGraph {
    fn default() -> Self {
        Self::new()
    }
}
