//! Cache hit ratio over terminating lookups.

use super::Collector;
use crate::tree::Tree;
use crate::types::{ContentId, FlowId, NodeId};

/// Ratio of flows served by an in-network cache.
///
/// Each flow terminates at exactly one lookup: a cache hit somewhere on
/// the request path, or the content's source. Intermediate cache misses
/// are counted separately but do not enter the ratio's denominator.
#[derive(Debug, Default)]
pub struct CacheHitRatioCollector {
    cache_hits: u64,
    server_hits: u64,
    cache_misses: u64,
}

impl CacheHitRatioCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for CacheHitRatioCollector {
    fn name(&self) -> &'static str {
        "CACHE_HIT_RATIO"
    }

    fn cache_hit_flow(&mut self, _node: NodeId, _content: ContentId, _flow: FlowId) {
        self.cache_hits += 1;
    }

    fn cache_miss_flow(&mut self, _node: NodeId, _content: ContentId, _flow: FlowId) {
        self.cache_misses += 1;
    }

    fn server_hit_flow(&mut self, _node: NodeId, _content: ContentId, _flow: FlowId) {
        self.server_hits += 1;
    }

    fn results(&self) -> Tree {
        let mut tree = Tree::new();
        let terminating = self.cache_hits + self.server_hits;
        let ratio = if terminating > 0 {
            self.cache_hits as f64 / terminating as f64
        } else {
            0.0
        };
        tree.set("MEAN", ratio);
        tree.set("CACHE_HITS", self.cache_hits);
        tree.set("SERVER_HITS", self.server_hits);
        tree.set("CACHE_MISSES", self.cache_misses);
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_over_terminating_lookups() {
        let mut collector = CacheHitRatioCollector::new();
        // Flow 0: miss at a router, served by the source.
        collector.cache_miss_flow(NodeId(1), ContentId(1), FlowId(0));
        collector.server_hit_flow(NodeId(2), ContentId(1), FlowId(0));
        // Flow 1: served by the router's cache.
        collector.cache_hit_flow(NodeId(1), ContentId(1), FlowId(1));
        let results = collector.results();
        assert_eq!(results.get_f64("MEAN"), Some(0.5));
        assert_eq!(results.get_f64("CACHE_MISSES"), Some(1.0));
    }

    #[test]
    fn empty_run_reports_zero() {
        let collector = CacheHitRatioCollector::new();
        assert_eq!(collector.results().get_f64("MEAN"), Some(0.0));
    }
}
