//! Cache-service queue behavior: admissions, rejections, occupancy.

use super::Collector;
use crate::tree::Tree;
use crate::types::{NodeId, PacketKind};

/// Aggregates admission decisions and queue-length samples.
///
/// Queue length is sampled at every admission, so `MEAN_QUEUE_SIZE` is
/// the occupancy an admitted operation observed, not a time average.
#[derive(Debug, Default)]
pub struct CacheQueueCollector {
    admitted_requests: u64,
    admitted_data: u64,
    rejected_requests: u64,
    rejected_data: u64,
    queue_len_sum: u64,
    queue_len_samples: u64,
}

impl CacheQueueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn admitted(&self) -> u64 {
        self.admitted_requests + self.admitted_data
    }

    fn rejected(&self) -> u64 {
        self.rejected_requests + self.rejected_data
    }
}

impl Collector for CacheQueueCollector {
    fn name(&self) -> &'static str {
        "CACHE_QUEUE"
    }

    fn record_pkt_admitted(&mut self, _node: NodeId, kind: PacketKind) {
        match kind {
            PacketKind::Data => self.admitted_data += 1,
            _ => self.admitted_requests += 1,
        }
    }

    fn record_pkt_rejected(&mut self, _node: NodeId, kind: PacketKind) {
        match kind {
            PacketKind::Data => self.rejected_data += 1,
            _ => self.rejected_requests += 1,
        }
    }

    fn report_cache_queue_size(&mut self, _node: NodeId, _kind: PacketKind, len: usize) {
        self.queue_len_sum += len as u64;
        self.queue_len_samples += 1;
    }

    fn results(&self) -> Tree {
        let mut tree = Tree::new();
        tree.set("ADMITTED.REQUEST", self.admitted_requests);
        tree.set("ADMITTED.DATA", self.admitted_data);
        tree.set("REJECTED.REQUEST", self.rejected_requests);
        tree.set("REJECTED.DATA", self.rejected_data);
        let total = self.admitted() + self.rejected();
        let rejection_ratio = if total > 0 {
            self.rejected() as f64 / total as f64
        } else {
            0.0
        };
        tree.set("REJECTION_RATIO", rejection_ratio);
        let mean_queue = if self.queue_len_samples > 0 {
            self.queue_len_sum as f64 / self.queue_len_samples as f64
        } else {
            0.0
        };
        tree.set("MEAN_QUEUE_SIZE", mean_queue);
        tree
    }
}
