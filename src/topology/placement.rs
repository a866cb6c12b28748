//! Cache and content placement over a topology.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::warn;

use super::Topology;
use crate::error::{Result, SimError};
use crate::types::{ContentId, NodeId};

/// Split a network-wide cache budget evenly across all routers.
///
/// The budget is `network_cache · n_contents` slots. Per-router sizes
/// that round below one slot are clamped to 1, because a zero-size cache
/// cannot express any replacement policy.
pub fn uniform_cache_placement(
    topo: &Topology,
    n_contents: u64,
    network_cache: f64,
) -> Result<HashMap<NodeId, usize>> {
    if !(network_cache > 0.0 && network_cache <= 1.0) {
        return Err(SimError::Config(format!(
            "network_cache must be in (0, 1], got {network_cache}"
        )));
    }
    let routers = topo.routers();
    if routers.is_empty() {
        return Err(SimError::Topology(
            "no routers to place caches on".into(),
        ));
    }
    let budget = network_cache * n_contents as f64;
    let mut per_node = (budget / routers.len() as f64).round() as usize;
    if per_node < 1 {
        warn!(
            budget,
            routers = routers.len(),
            "cache budget rounds below one slot per router; clamping to 1"
        );
        per_node = 1;
    }
    Ok(routers.iter().map(|&node| (node, per_node)).collect())
}

/// Assign every content a source node drawn uniformly at random.
///
/// The resulting index is total: every content in `1..=n_contents` has
/// exactly one source, so `NoSource` can only arise from out-of-range
/// content ids.
pub fn uniform_content_placement(
    topo: &Topology,
    n_contents: u64,
    rng: &mut StdRng,
) -> Result<HashMap<ContentId, NodeId>> {
    let sources = topo.sources();
    if sources.is_empty() {
        return Err(SimError::Topology("no source nodes for contents".into()));
    }
    let mut placement = HashMap::with_capacity(n_contents as usize);
    for id in 1..=n_contents {
        let node = sources
            .choose(rng)
            .copied()
            .ok_or_else(|| SimError::Topology("no source nodes for contents".into()))?;
        placement.insert(ContentId(id), node);
    }
    Ok(placement)
}
