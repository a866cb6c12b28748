//! End-to-end latency per flow.

use std::collections::HashMap;

use super::Collector;
use crate::tree::Tree;
use crate::types::{ContentId, FlowId, NodeId};

/// Sums main-path hop delays and cache-operation delays per flow.
///
/// A flow's latency is the sum of the link delays of every main-path hop
/// it reports, plus every queueing delay charged by an admitted cache
/// operation. For packet-level strategies this equals the difference
/// between session end and start times.
#[derive(Debug)]
pub struct LatencyCollector {
    link_delays: HashMap<(NodeId, NodeId), f64>,
    pending: HashMap<FlowId, f64>,
    sum: f64,
    count: u64,
}

impl LatencyCollector {
    pub fn new(link_delays: HashMap<(NodeId, NodeId), f64>) -> Self {
        Self {
            link_delays,
            pending: HashMap::new(),
            sum: 0.0,
            count: 0,
        }
    }

    fn add_hop(&mut self, u: NodeId, v: NodeId, flow: FlowId, main_path: bool) {
        if !main_path {
            return;
        }
        if let Some(&delay) = self.link_delays.get(&(u, v)) {
            *self.pending.entry(flow).or_insert(0.0) += delay;
        }
    }

    fn finish(&mut self, flow: FlowId, success: bool) {
        if let Some(latency) = self.pending.remove(&flow)
            && success
        {
            self.sum += latency;
            self.count += 1;
        }
    }
}

impl Collector for LatencyCollector {
    fn name(&self) -> &'static str {
        "LATENCY"
    }

    fn start_flow_session(
        &mut self,
        _time: f64,
        _receiver: NodeId,
        _content: ContentId,
        flow: FlowId,
    ) {
        self.pending.insert(flow, 0.0);
    }

    fn request_hop_flow(&mut self, u: NodeId, v: NodeId, flow: FlowId, main_path: bool) {
        self.add_hop(u, v, flow, main_path);
    }

    fn content_hop_flow(&mut self, u: NodeId, v: NodeId, flow: FlowId, main_path: bool) {
        self.add_hop(u, v, flow, main_path);
    }

    fn cache_operation_flow(&mut self, flow: FlowId, delay: f64) {
        *self.pending.entry(flow).or_insert(0.0) += delay;
    }

    fn end_flow_session(&mut self, flow: FlowId, success: bool) {
        self.finish(flow, success);
    }

    fn end_flow_session_cache_delay(&mut self, flow: FlowId, success: bool) {
        self.finish(flow, success);
    }

    fn results(&self) -> Tree {
        let mut tree = Tree::new();
        let mean = if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        };
        tree.set("MEAN", mean);
        tree.set("FLOWS", self.count);
        tree
    }
}
