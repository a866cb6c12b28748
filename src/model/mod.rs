//! Network model, view and controller.
//!
//! The network is modelled MVC-style: [`NetworkModel`] holds all mutable
//! state (caches, cache-service queues, both event heaps, per-flow
//! scratch), [`View`] is a read-only projection handed to strategies,
//! and [`Controller`] is the only mutation path — it updates the model
//! and notifies the attached collector of every reportable event.
//!
//! Strategies therefore cannot corrupt engine state: they read through
//! the view and act through the controller, one dispatched event at a
//! time.

mod controller;
mod scheduler;
mod view;

pub use controller::Controller;
pub use scheduler::Scheduler;
pub use view::View;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::cache::{CachePolicy, build_policy};
use crate::error::Result;
use crate::topology::Topology;
use crate::types::{ContentId, FlowId, NodeId};

/// Default cache read service time.
pub const DEFAULT_READ_DELAY_PENALTY: f64 = 100.0;
/// Default cache write service time.
pub const DEFAULT_WRITE_DELAY_PENALTY: f64 = 100.0;
/// Default cache-service queue capacity.
pub const DEFAULT_CACHE_QUEUE_SIZE: usize = 10;

/// Per-flow strategy scratch state.
///
/// Created on first touch, discarded when the flow ends. Strategies own
/// the meaning of these fields; the model only stores them.
#[derive(Debug, Clone, Default)]
pub struct FlowScratch {
    /// LCD variants: whether the single downstream copy was already made.
    pub lcd_copied: bool,
    /// ProbCache: caching nodes visited on the request path.
    pub pc_c: u64,
    /// ProbCache: sum of cache sizes from the current position to the source.
    pub pc_n: u64,
    /// ProbCache: caching nodes passed on the return path.
    pub pc_x: f64,
    /// Avoid-busy-node variants: nodes that rejected this flow.
    pub busy_nodes: HashSet<NodeId>,
}

/// The internal state of the simulated network.
///
/// Never edited by strategies directly — only through [`Controller`].
pub struct NetworkModel {
    pub(crate) topology: Topology,
    pub(crate) content_source: HashMap<ContentId, NodeId>,
    pub(crate) source_contents: HashMap<NodeId, HashSet<ContentId>>,
    pub(crate) caches: HashMap<NodeId, Box<dyn CachePolicy>>,
    pub(crate) cache_sizes: HashMap<NodeId, usize>,
    pub(crate) scheduler: Scheduler,
    pub(crate) scratch: HashMap<FlowId, FlowScratch>,
    pub(crate) read_delay_penalty: f64,
    pub(crate) write_delay_penalty: f64,
    pub(crate) cache_queue_size: usize,
}

impl NetworkModel {
    /// Assemble a model from a topology, a cache placement, and a content
    /// placement.
    ///
    /// `policy_seed` feeds stochastic cache policies so whole runs stay
    /// reproducible under one configuration seed.
    pub fn new(
        topology: Topology,
        cache_sizes: HashMap<NodeId, usize>,
        content_source: HashMap<ContentId, NodeId>,
        policy_name: &str,
        policy_seed: u64,
    ) -> Result<Self> {
        let mut caches: HashMap<NodeId, Box<dyn CachePolicy>> = HashMap::new();
        for (&node, &size) in &cache_sizes {
            caches.insert(node, build_policy(policy_name, size, policy_seed ^ node.0 as u64)?);
        }

        let mut source_contents: HashMap<NodeId, HashSet<ContentId>> = HashMap::new();
        for (&content, &node) in &content_source {
            source_contents.entry(node).or_default().insert(content);
        }

        debug!(
            nodes = topology.node_count(),
            caches = caches.len(),
            contents = content_source.len(),
            policy = policy_name,
            "network model assembled"
        );

        Ok(Self {
            topology,
            content_source,
            source_contents,
            caches,
            cache_sizes,
            scheduler: Scheduler::new(),
            scratch: HashMap::new(),
            read_delay_penalty: DEFAULT_READ_DELAY_PENALTY,
            write_delay_penalty: DEFAULT_WRITE_DELAY_PENALTY,
            cache_queue_size: DEFAULT_CACHE_QUEUE_SIZE,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;

    #[test]
    fn model_builds_caches_per_placement() {
        let topo = Topology::path(4, 1.0).unwrap();
        let sizes = HashMap::from([(NodeId(1), 2), (NodeId(2), 3)]);
        let contents = HashMap::from([(ContentId(1), NodeId(3))]);
        let model = NetworkModel::new(topo, sizes, contents, "LRU", 0).unwrap();
        assert_eq!(model.caches.len(), 2);
        assert_eq!(model.caches[&NodeId(2)].maxlen(), 3);
        assert_eq!(model.read_delay_penalty, 100.0);
        assert_eq!(model.cache_queue_size, 10);
    }

    #[test]
    fn model_rejects_unknown_policy() {
        let topo = Topology::path(3, 1.0).unwrap();
        let sizes = HashMap::from([(NodeId(1), 2)]);
        let contents = HashMap::from([(ContentId(1), NodeId(2))]);
        assert!(NetworkModel::new(topo, sizes, contents, "MRU", 0).is_err());
    }
}
