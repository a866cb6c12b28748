//! Path stretch: traversed hops relative to the shortest round trip.

use std::collections::HashMap;

use super::Collector;
use crate::tree::Tree;
use crate::types::{ContentId, FlowId, NodeId};

/// Per-flow stretch of the traversed path.
///
/// A flow that goes all the way to the source and straight back has
/// stretch 1.0; a cache hit below the source yields a stretch below 1.0.
#[derive(Debug)]
pub struct PathStretchCollector {
    // (receiver, source) -> shortest hop count
    optimal_hops: HashMap<(NodeId, NodeId), usize>,
    content_source: HashMap<ContentId, NodeId>,
    // flow -> (receiver, content, traversed hops)
    flows: HashMap<FlowId, (NodeId, ContentId, u64)>,
    sum: f64,
    count: u64,
}

impl PathStretchCollector {
    pub fn new(
        optimal_hops: HashMap<(NodeId, NodeId), usize>,
        content_source: HashMap<ContentId, NodeId>,
    ) -> Self {
        Self {
            optimal_hops,
            content_source,
            flows: HashMap::new(),
            sum: 0.0,
            count: 0,
        }
    }

    fn count_hop(&mut self, flow: FlowId) {
        if let Some((_, _, hops)) = self.flows.get_mut(&flow) {
            *hops += 1;
        }
    }

    fn finish(&mut self, flow: FlowId, success: bool) {
        let Some((receiver, content, hops)) = self.flows.remove(&flow) else {
            return;
        };
        if !success {
            return;
        }
        let Some(&source) = self.content_source.get(&content) else {
            return;
        };
        let Some(&optimal) = self.optimal_hops.get(&(receiver, source)) else {
            return;
        };
        if optimal > 0 {
            self.sum += hops as f64 / (2 * optimal) as f64;
            self.count += 1;
        }
    }
}

impl Collector for PathStretchCollector {
    fn name(&self) -> &'static str {
        "PATH_STRETCH"
    }

    fn start_flow_session(
        &mut self,
        _time: f64,
        receiver: NodeId,
        content: ContentId,
        flow: FlowId,
    ) {
        self.flows.insert(flow, (receiver, content, 0));
    }

    fn request_hop_flow(&mut self, _u: NodeId, _v: NodeId, flow: FlowId, main_path: bool) {
        if main_path {
            self.count_hop(flow);
        }
    }

    fn content_hop_flow(&mut self, _u: NodeId, _v: NodeId, flow: FlowId, main_path: bool) {
        if main_path {
            self.count_hop(flow);
        }
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
