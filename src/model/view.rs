//! Read-only projection of the network model.

use std::collections::{HashMap, HashSet};

use super::NetworkModel;
use crate::error::{Result, SimError};
use crate::types::{ContentId, Event, FlowId, NodeId, PacketKind};

/// What strategies and collectors may know about the network.
///
/// A `View` borrows the model immutably, so holding one across a
/// controller mutation is impossible by construction.
#[derive(Clone, Copy)]
pub struct View<'a> {
    model: &'a NetworkModel,
}

impl<'a> View<'a> {
    pub(super) fn new(model: &'a NetworkModel) -> Self {
        Self { model }
    }

    /// Shortest path from `s` to `t`, both endpoints included.
    pub fn shortest_path(&self, s: NodeId, t: NodeId) -> Option<&'a [NodeId]> {
        self.model.topology.shortest_path(s, t)
    }

    /// The next hop from `node` toward `dest` and the delay of that link.
    ///
    /// This is the step every packet-level transition takes; failure
    /// means the topology lost a route it was validated to have, which
    /// is a hard fault.
    pub fn next_hop(&self, node: NodeId, dest: NodeId) -> Result<(NodeId, f64)> {
        let path = self
            .shortest_path(node, dest)
            .ok_or_else(|| SimError::Topology(format!("no route from {node} to {dest}")))?;
        let next = path
            .get(1)
            .copied()
            .ok_or_else(|| SimError::Topology(format!("no next hop from {node} to {dest}")))?;
        let delay = self
            .link_delay(node, next)
            .ok_or_else(|| SimError::Topology(format!("no link {node} -> {next}")))?;
        Ok((next, delay))
    }

    pub fn link_delay(&self, u: NodeId, v: NodeId) -> Option<f64> {
        self.model.topology.link_delay(u, v)
    }

    /// The node persistently storing `content`, if any.
    pub fn content_source(&self, content: ContentId) -> Option<NodeId> {
        self.model.content_source.get(&content).copied()
    }

    /// Every node currently holding `content`: caches plus its source.
    pub fn content_locations(&self, content: ContentId) -> HashSet<NodeId> {
        let mut locations: HashSet<NodeId> = self
            .model
            .caches
            .iter()
            .filter(|(_, cache)| cache.has(content))
            .map(|(&node, _)| node)
            .collect();
        if let Some(source) = self.content_source(content) {
            locations.insert(source);
        }
        locations
    }

    pub fn has_cache(&self, node: NodeId) -> bool {
        self.model.caches.contains_key(&node)
    }

    /// Capacity of the cache at `node`, if it has one.
    pub fn cache_size(&self, node: NodeId) -> Option<usize> {
        self.model.cache_sizes.get(&node).copied()
    }

    /// All caching nodes with their capacities.
    pub fn cache_nodes(&self) -> &'a HashMap<NodeId, usize> {
        &self.model.cache_sizes
    }

    /// Non-mutating membership test, for collectors.
    ///
    /// Returns `None` when the node has no cache. Unlike
    /// [`Controller::get_content_flow`](super::Controller::get_content_flow),
    /// this never touches replacement state.
    pub fn cache_lookup(&self, node: NodeId, content: ContentId) -> Option<bool> {
        self.model.caches.get(&node).map(|cache| cache.has(content))
    }

    /// Contents currently cached at `node`, best-retained first.
    pub fn cache_dump(&self, node: NodeId) -> Option<Vec<ContentId>> {
        self.model.caches.get(&node).map(|cache| cache.dump())
    }

    /// Pending cache-service ops at `node` (the in-service op excluded).
    pub fn cache_queue_len(&self, node: NodeId) -> usize {
        self.model.scheduler.cache_queue_len(node)
    }

    /// Every cache-service queue that has seen traffic, with its length.
    pub fn known_cache_queues(&self) -> Vec<(NodeId, usize)> {
        self.model.scheduler.known_cache_queues().collect()
    }

    /// The cache-service queue capacity.
    pub fn cache_queue_capacity(&self) -> usize {
        self.model.cache_queue_size
    }

    pub fn read_delay_penalty(&self) -> f64 {
        self.model.read_delay_penalty
    }

    pub fn write_delay_penalty(&self) -> f64 {
        self.model.write_delay_penalty
    }

    /// Completion delay seen by a cache op admitted at `node` now.
    ///
    /// Sums the service times of the in-service op and every pending op:
    /// a read costs the read penalty, a write the write penalty. With an
    /// op in service the result is `ceil(server.time + total - t_now)`
    /// clamped to zero — the ceiling and the in-service op's full service
    /// time are required for exact latency accounting.
    pub fn cache_queue_delay(&self, node: NodeId, t_now: f64) -> f64 {
        let service = |ev: &Event| match ev.pkt_type {
            PacketKind::GetContent => self.model.read_delay_penalty,
            PacketKind::PutContent => self.model.write_delay_penalty,
            _ => 0.0,
        };
        let queued: f64 = self.model.scheduler.cache_events(node).map(service).sum();
        match self.model.scheduler.server(node) {
            None if self.cache_queue_len(node) == 0 => 0.0,
            None => queued,
            Some(in_service) => {
                let total = service(in_service) + queued;
                (in_service.time + total - t_now).ceil().max(0.0)
            }
        }
    }

    /// The earliest pending link event.
    pub fn peek_next_event(&self) -> Option<&'a Event> {
        self.model.scheduler.peek_link()
    }

    /// The earliest pending cache-service event across all nodes.
    pub fn peek_next_cache_event(&self) -> Option<&'a Event> {
        self.model.scheduler.peek_cache_min()
    }

    /// Whether any event remains on either heap.
    pub fn has_pending_events(&self) -> bool {
        !self.model.scheduler.is_empty()
    }

    // Per-flow scratch. Reads of untouched flows yield zeroed defaults.

    pub fn lcd_copied(&self, flow: FlowId) -> bool {
        self.model
            .scratch
            .get(&flow)
            .is_some_and(|s| s.lcd_copied)
    }

    pub fn probcache_c(&self, flow: FlowId) -> u64 {
        self.model.scratch.get(&flow).map_or(0, |s| s.pc_c)
    }

    pub fn probcache_n(&self, flow: FlowId) -> u64 {
        self.model.scratch.get(&flow).map_or(0, |s| s.pc_n)
    }

    pub fn probcache_x(&self, flow: FlowId) -> f64 {
        self.model.scratch.get(&flow).map_or(0.0, |s| s.pc_x)
    }

    /// Whether `node` has rejected a packet of `flow`.
    pub fn is_busy_node(&self, flow: FlowId, node: NodeId) -> bool {
        self.model
            .scratch
            .get(&flow)
            .is_some_and(|s| s.busy_nodes.contains(&node))
    }

    pub fn topology(&self) -> &'a crate::topology::Topology {
        &self.model.topology
    }
}
