//! EQ stage builder
//!
//! Deterministically rewires a lane's filter stage from the enabled flag
//! and band list. The rebuild is a full disconnect + reconstruct, so it is
//! safe to run on every settings change.

use crate::audio::graph::FilterNode;
use crate::audio::WORKING_SAMPLE_RATE;
use crate::playback::lanes::Lane;
use segue_common::params::EqBand;
use tracing::debug;

/// Rebuild `lane`'s filter stage.
///
/// With EQ enabled and a non-empty band list the chain becomes
/// `source → f1 → … → fn → gain → output`, one peaking filter per band in
/// band order; otherwise the stage is bypassed (`source → gain → output`).
pub fn apply_eq(lane: &mut Lane, enabled: bool, bands: &[EqBand]) {
    let filters: Vec<FilterNode> = if enabled && !bands.is_empty() {
        bands
            .iter()
            .map(|band| FilterNode::new(*band, WORKING_SAMPLE_RATE))
            .collect()
    } else {
        Vec::new()
    };

    debug!(
        "Rebuilding EQ stage on lane {}: {} filter(s)",
        lane.key(),
        filters.len()
    );
    lane.graph_mut().set_filter_stage(filters);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NodeRef;
    use crate::playback::lanes::{LaneKey, LaneManager};

    fn bands() -> Vec<EqBand> {
        vec![
            EqBand::new(60.0, 4.0, 0.707),
            EqBand::new(1_000.0, -3.0, 1.0),
            EqBand::new(12_000.0, 2.0, 0.9),
        ]
    }

    #[tokio::test]
    async fn test_enabled_builds_one_filter_per_band() {
        let mut manager = LaneManager::new();
        let lane = manager.ensure_lane(LaneKey::A);

        apply_eq(lane, true, &bands());

        assert_eq!(lane.graph().filters().len(), 3);
        assert_eq!(
            lane.graph().chain(),
            vec![
                NodeRef::Source,
                NodeRef::Filter(0),
                NodeRef::Filter(1),
                NodeRef::Filter(2),
                NodeRef::Gain,
                NodeRef::Output,
            ]
        );
    }

    #[tokio::test]
    async fn test_band_order_is_preserved() {
        let mut manager = LaneManager::new();
        let lane = manager.ensure_lane(LaneKey::A);
        let bands = bands();

        apply_eq(lane, true, &bands);

        let stage_freqs: Vec<f32> = lane
            .graph()
            .filters()
            .iter()
            .map(|f| f.band().frequency_hz)
            .collect();
        assert_eq!(stage_freqs, vec![60.0, 1_000.0, 12_000.0]);
    }

    #[tokio::test]
    async fn test_disabled_bypasses_stage() {
        let mut manager = LaneManager::new();
        let lane = manager.ensure_lane(LaneKey::A);

        apply_eq(lane, true, &bands());
        apply_eq(lane, false, &bands());

        assert!(lane.graph().filters().is_empty());
        assert_eq!(
            lane.graph().chain(),
            vec![NodeRef::Source, NodeRef::Gain, NodeRef::Output]
        );
    }

    #[tokio::test]
    async fn test_empty_bands_bypasses_stage() {
        let mut manager = LaneManager::new();
        let lane = manager.ensure_lane(LaneKey::A);

        apply_eq(lane, true, &[]);
        assert_eq!(lane.graph().edge_count(), 2);
    }

    #[tokio::test]
    async fn test_repeated_application_is_idempotent() {
        let mut manager = LaneManager::new();
        let lane = manager.ensure_lane(LaneKey::A);
        let bands = bands();

        apply_eq(lane, true, &bands);
        let expected = (lane.graph().chain(), lane.graph().edge_count());

        for _ in 0..5 {
            apply_eq(lane, true, &bands);
        }
        assert_eq!(
            (lane.graph().chain(), lane.graph().edge_count()),
            expected
        );
    }
}
