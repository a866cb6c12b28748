//! Packet counts per link over the measured window.

use std::collections::HashMap;

use super::Collector;
use crate::topology::LinkType;
use crate::tree::Tree;
use crate::types::{ContentId, FlowId, NodeId};

/// Counts packets per directed link and normalises by the measured
/// duration (first to last logged session start).
#[derive(Debug)]
pub struct LinkLoadCollector {
    link_types: HashMap<(NodeId, NodeId), LinkType>,
    counts: HashMap<(NodeId, NodeId), u64>,
    t_first: Option<f64>,
    t_last: Option<f64>,
}

impl LinkLoadCollector {
    pub fn new(link_types: HashMap<(NodeId, NodeId), LinkType>) -> Self {
        Self {
            link_types,
            counts: HashMap::new(),
            t_first: None,
            t_last: None,
        }
    }

    fn count_hop(&mut self, u: NodeId, v: NodeId) {
        *self.counts.entry((u, v)).or_insert(0) += 1;
    }

    fn duration(&self) -> f64 {
        match (self.t_first, self.t_last) {
            (Some(first), Some(last)) if last > first => last - first,
            _ => 1.0,
        }
    }
}

impl Collector for LinkLoadCollector {
    fn name(&self) -> &'static str {
        "LINK_LOAD"
    }

    fn start_flow_session(
        &mut self,
        time: f64,
        _receiver: NodeId,
        _content: ContentId,
        _flow: FlowId,
    ) {
        if self.t_first.is_none() {
            self.t_first = Some(time);
        }
        self.t_last = Some(time);
    }

    fn request_hop_flow(&mut self, u: NodeId, v: NodeId, _flow: FlowId, _main_path: bool) {
        self.count_hop(u, v);
    }

    fn content_hop_flow(&mut self, u: NodeId, v: NodeId, _flow: FlowId, _main_path: bool) {
        self.count_hop(u, v);
    }

    fn results(&self) -> Tree {
        let duration = self.duration();
        let mut internal = Vec::new();
        let mut external = Vec::new();
        for (link, &count) in &self.counts {
            let load = count as f64 / duration;
            match self.link_types.get(link) {
                Some(LinkType::External) => external.push(load),
                _ => internal.push(load),
            }
        }
        let mean = |loads: &[f64]| {
            if loads.is_empty() {
                0.0
            } else {
                loads.iter().sum::<f64>() / loads.len() as f64
            }
        };
        let mut tree = Tree::new();
        tree.set("MEAN_INTERNAL", mean(&internal));
        tree.set("MEAN_EXTERNAL", mean(&external));
        tree.set("DURATION", duration);
        tree
    }
}
