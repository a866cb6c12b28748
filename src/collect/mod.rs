//! Metric collection.
//!
//! The engine reports structured events — session boundaries, hops,
//! cache outcomes, admission decisions — to a [`Collector`]. Collectors
//! aggregate whatever subset of the stream they care about and render a
//! results [`Tree`] at the end of the run.
//!
//! Only logged (post-warmup) events reach collectors; the controller
//! applies the gate, so collector arithmetic is always over the measured
//! window.
//!
//! [`CollectorProxy`] fans one event stream out to every collector
//! selected by the `data_collectors` configuration key.

mod cache_hit;
mod cache_queue;
mod latency;
mod link_load;
mod path_stretch;

pub use cache_hit::CacheHitRatioCollector;
pub use cache_queue::CacheQueueCollector;
pub use latency::LatencyCollector;
pub use link_load::LinkLoadCollector;
pub use path_stretch::PathStretchCollector;

use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::topology::Topology;
use crate::tree::Tree;
use crate::types::{ContentId, FlowId, NodeId, PacketKind};

/// Sink for the engine's structured event stream.
///
/// Every method has a no-op default so collectors implement only what
/// they aggregate.
pub trait Collector {
    /// Registry name, used as the key of this collector's results subtree.
    fn name(&self) -> &'static str;

    fn start_flow_session(
        &mut self,
        _time: f64,
        _receiver: NodeId,
        _content: ContentId,
        _flow: FlowId,
    ) {
    }

    fn request_hop_flow(&mut self, _u: NodeId, _v: NodeId, _flow: FlowId, _main_path: bool) {}

    fn content_hop_flow(&mut self, _u: NodeId, _v: NodeId, _flow: FlowId, _main_path: bool) {}

    fn cache_hit_flow(&mut self, _node: NodeId, _content: ContentId, _flow: FlowId) {}

    fn cache_miss_flow(&mut self, _node: NodeId, _content: ContentId, _flow: FlowId) {}

    fn server_hit_flow(&mut self, _node: NodeId, _content: ContentId, _flow: FlowId) {}

    fn cache_operation_flow(&mut self, _flow: FlowId, _delay: f64) {}

    fn report_cache_queue_size(&mut self, _node: NodeId, _kind: PacketKind, _len: usize) {}

    fn record_pkt_admitted(&mut self, _node: NodeId, _kind: PacketKind) {}

    fn record_pkt_rejected(&mut self, _node: NodeId, _kind: PacketKind) {}

    fn end_flow_session(&mut self, _flow: FlowId, _success: bool) {}

    fn end_flow_session_cache_delay(&mut self, _flow: FlowId, _success: bool) {}

    /// Aggregated results at the end of the run.
    fn results(&self) -> Tree;
}

/// Fans the event stream out to every attached collector.
#[derive(Default)]
pub struct CollectorProxy {
    collectors: Vec<Box<dyn Collector>>,
}

impl std::fmt::Debug for CollectorProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorProxy")
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

macro_rules! fan_out {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        for collector in &mut $self.collectors {
            collector.$method($($arg),*);
        }
    };
}

impl CollectorProxy {
    pub fn new(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self { collectors }
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn start_flow_session(
        &mut self,
        time: f64,
        receiver: NodeId,
        content: ContentId,
        flow: FlowId,
    ) {
        fan_out!(self, start_flow_session(time, receiver, content, flow));
    }

    pub fn request_hop_flow(&mut self, u: NodeId, v: NodeId, flow: FlowId, main_path: bool) {
        fan_out!(self, request_hop_flow(u, v, flow, main_path));
    }

    pub fn content_hop_flow(&mut self, u: NodeId, v: NodeId, flow: FlowId, main_path: bool) {
        fan_out!(self, content_hop_flow(u, v, flow, main_path));
    }

    pub fn cache_hit_flow(&mut self, node: NodeId, content: ContentId, flow: FlowId) {
        fan_out!(self, cache_hit_flow(node, content, flow));
    }

    pub fn cache_miss_flow(&mut self, node: NodeId, content: ContentId, flow: FlowId) {
        fan_out!(self, cache_miss_flow(node, content, flow));
    }

    pub fn server_hit_flow(&mut self, node: NodeId, content: ContentId, flow: FlowId) {
        fan_out!(self, server_hit_flow(node, content, flow));
    }

    pub fn cache_operation_flow(&mut self, flow: FlowId, delay: f64) {
        fan_out!(self, cache_operation_flow(flow, delay));
    }

    pub fn report_cache_queue_size(&mut self, node: NodeId, kind: PacketKind, len: usize) {
        fan_out!(self, report_cache_queue_size(node, kind, len));
    }

    pub fn record_pkt_admitted(&mut self, node: NodeId, kind: PacketKind) {
        fan_out!(self, record_pkt_admitted(node, kind));
    }

    pub fn record_pkt_rejected(&mut self, node: NodeId, kind: PacketKind) {
        fan_out!(self, record_pkt_rejected(node, kind));
    }

    pub fn end_flow_session(&mut self, flow: FlowId, success: bool) {
        fan_out!(self, end_flow_session(flow, success));
    }

    pub fn end_flow_session_cache_delay(&mut self, flow: FlowId, success: bool) {
        fan_out!(self, end_flow_session_cache_delay(flow, success));
    }

    /// Merge every collector's results, keyed by collector name.
    pub fn results(&self) -> Tree {
        let mut tree = Tree::new();
        for collector in &self.collectors {
            tree.set_tree(collector.name(), collector.results());
        }
        tree
    }
}

/// Build the collectors selected in `data_collectors`.
pub fn build_collectors(
    names: &[String],
    topo: &Topology,
    content_source: &HashMap<ContentId, NodeId>,
) -> Result<CollectorProxy> {
    let mut collectors: Vec<Box<dyn Collector>> = Vec::with_capacity(names.len());
    for name in names {
        match name.as_str() {
            "CACHE_HIT_RATIO" => collectors.push(Box::new(CacheHitRatioCollector::new())),
            "LATENCY" => collectors.push(Box::new(LatencyCollector::new(
                topo.link_delays().clone(),
            ))),
            "CACHE_QUEUE" => collectors.push(Box::new(CacheQueueCollector::new())),
            "LINK_LOAD" => collectors.push(Box::new(LinkLoadCollector::new(
                topo.link_types().clone(),
            ))),
            "PATH_STRETCH" => {
                let mut hops = HashMap::new();
                for &receiver in topo.receivers() {
                    for &source in topo.sources() {
                        if let Some(h) = topo.path_hops(receiver, source) {
                            hops.insert((receiver, source), h);
                        }
                    }
                }
                collectors.push(Box::new(PathStretchCollector::new(
                    hops,
                    content_source.clone(),
                )));
            }
            other => {
                return Err(SimError::Config(format!(
                    "unknown data collector '{other}'"
                )));
            }
        }
    }
    Ok(CollectorProxy::new(collectors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_merges_results_by_name() {
        let proxy = CollectorProxy::new(vec![
            Box::new(CacheHitRatioCollector::new()),
            Box::new(CacheQueueCollector::new()),
        ]);
        let results = proxy.results();
        assert!(results.get("CACHE_HIT_RATIO").is_some());
        assert!(results.get("CACHE_QUEUE").is_some());
    }

    #[test]
    fn unknown_collector_is_a_config_error() {
        let topo = Topology::path(3, 1.0).unwrap();
        let err = build_collectors(&["THROUGHPUT".into()], &topo, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("THROUGHPUT"));
    }

    #[test]
    fn all_known_collectors_build() {
        let topo = Topology::path(3, 1.0).unwrap();
        let names: Vec<String> = [
            "CACHE_HIT_RATIO",
            "LATENCY",
            "CACHE_QUEUE",
            "LINK_LOAD",
            "PATH_STRETCH",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let sources = HashMap::from([(ContentId(1), NodeId(2))]);
        let proxy = build_collectors(&names, &topo, &sources).unwrap();
        assert!(!proxy.is_empty());
    }
}
