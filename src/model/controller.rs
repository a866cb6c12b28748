//! The single mutation path into the network model.

use metrics::counter;

use super::{NetworkModel, View};
use crate::collect::CollectorProxy;
use crate::error::Result;
use crate::telemetry;
use crate::types::{ContentId, Event, FlowId, NodeId, PacketKind};

/// State of one session-level content retrieval.
///
/// Packet-level strategies carry their context inside events; the
/// session-level strategies instead walk a whole retrieval within one
/// `process_event` call, scoped by this record.
#[derive(Debug, Clone)]
struct Session {
    content: ContentId,
    flow: FlowId,
    log: bool,
}

/// Executes operations on the network model on behalf of strategies and
/// notifies the attached collector of every reportable event.
pub struct Controller {
    model: NetworkModel,
    collector: Option<CollectorProxy>,
    session: Option<Session>,
}

impl Controller {
    pub fn new(model: NetworkModel) -> Self {
        Self {
            model,
            collector: None,
            session: None,
        }
    }

    /// Read-only view of the model for strategies and collectors.
    pub fn view(&self) -> View<'_> {
        View::new(&self.model)
    }

    /// Attach the collector all events will be reported to.
    pub fn attach_collector(&mut self, collector: CollectorProxy) {
        self.collector = Some(collector);
    }

    /// Detach and return the collector, e.g. to read out its results.
    pub fn detach_collector(&mut self) -> Option<CollectorProxy> {
        self.collector.take()
    }

    /// Override the cache-service read/write service times and queue
    /// capacity.
    pub fn configure_cache_queue(&mut self, read_penalty: f64, write_penalty: f64, size: usize) {
        self.model.read_delay_penalty = read_penalty;
        self.model.write_delay_penalty = write_penalty;
        self.model.cache_queue_size = size;
    }

    // ------------------------------------------------------------------
    // Flow lifecycle
    // ------------------------------------------------------------------

    pub fn start_flow_session(
        &mut self,
        time: f64,
        receiver: NodeId,
        content: ContentId,
        flow: FlowId,
        log: bool,
    ) {
        counter!(telemetry::FLOWS_STARTED_TOTAL).increment(1);
        if log && let Some(collector) = &mut self.collector {
            collector.start_flow_session(time, receiver, content, flow);
        }
    }

    pub fn end_flow_session(&mut self, flow: FlowId, log: bool, success: bool) {
        counter!(telemetry::FLOWS_COMPLETED_TOTAL).increment(1);
        if log && let Some(collector) = &mut self.collector {
            collector.end_flow_session(flow, success);
        }
        self.model.scratch.remove(&flow);
    }

    pub fn end_flow_session_cache_delay(&mut self, flow: FlowId, log: bool, success: bool) {
        counter!(telemetry::FLOWS_COMPLETED_TOTAL).increment(1);
        if log && let Some(collector) = &mut self.collector {
            collector.end_flow_session_cache_delay(flow, success);
        }
        self.model.scratch.remove(&flow);
    }

    // ------------------------------------------------------------------
    // Forwarding
    // ------------------------------------------------------------------

    pub fn forward_request_hop_flow(&mut self, u: NodeId, v: NodeId, flow: FlowId, log: bool) {
        if log && let Some(collector) = &mut self.collector {
            collector.request_hop_flow(u, v, flow, true);
        }
    }

    pub fn forward_content_hop_flow(&mut self, u: NodeId, v: NodeId, flow: FlowId, log: bool) {
        if log && let Some(collector) = &mut self.collector {
            collector.content_hop_flow(u, v, flow, true);
        }
    }

    // ------------------------------------------------------------------
    // Content operations
    // ------------------------------------------------------------------

    /// Consult `node` for `content`.
    ///
    /// A caching node answers from its cache (mutating replacement
    /// state) and reports the hit or miss; the content's source answers
    /// unconditionally and reports a server hit. Anything else misses
    /// silently.
    pub fn get_content_flow(
        &mut self,
        node: NodeId,
        content: ContentId,
        flow: FlowId,
        log: bool,
    ) -> bool {
        if let Some(cache) = self.model.caches.get_mut(&node) {
            let hit = cache.get(content);
            if hit {
                counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
            } else {
                counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
            }
            if log && let Some(collector) = &mut self.collector {
                if hit {
                    collector.cache_hit_flow(node, content, flow);
                } else {
                    collector.cache_miss_flow(node, content, flow);
                }
            }
            return hit;
        }
        if self
            .model
            .source_contents
            .get(&node)
            .is_some_and(|contents| contents.contains(&content))
        {
            counter!(telemetry::SERVER_HITS_TOTAL).increment(1);
            if log && let Some(collector) = &mut self.collector {
                collector.server_hit_flow(node, content, flow);
            }
            return true;
        }
        false
    }

    /// Insert `content` into the cache at `node`, if it has one.
    ///
    /// Returns the evicted content, if the insertion displaced one.
    pub fn put_content_flow(
        &mut self,
        node: NodeId,
        content: ContentId,
        _flow: FlowId,
    ) -> Option<ContentId> {
        self.model
            .caches
            .get_mut(&node)
            .and_then(|cache| cache.put(content))
    }

    /// Remove `content` from the cache at `node`, if present.
    pub fn remove_content(&mut self, node: NodeId, content: ContentId) -> bool {
        self.model
            .caches
            .get_mut(&node)
            .is_some_and(|cache| cache.remove(content))
    }

    // ------------------------------------------------------------------
    // Event heaps
    // ------------------------------------------------------------------

    /// Push a link event.
    pub fn add_event(&mut self, event: Event) {
        self.model.scheduler.push_link(event);
    }

    /// Pop the earliest link event.
    pub fn pop_next_event(&mut self) -> Result<Event> {
        self.model.scheduler.pop_link()
    }

    /// Push a cache-service event at `node`.
    pub fn add_cache_queue_event(&mut self, node: NodeId, event: Event) {
        self.model.scheduler.push_cache(node, event);
    }

    /// Pop the earliest cache-service event at `node`.
    pub fn pop_next_cache_event(&mut self, node: NodeId) -> Result<Event> {
        self.model.scheduler.pop_cache(node)
    }

    /// Move a dispatched cache-service event into `node`'s server slot.
    pub fn update_cache_queue_server(&mut self, node: NodeId, t: f64, event: Event) {
        self.model.scheduler.set_server(node, t, event);
    }

    // ------------------------------------------------------------------
    // Cache-service accounting
    // ------------------------------------------------------------------

    pub fn record_pkt_admitted(&mut self, node: NodeId, kind: PacketKind, log: bool) {
        counter!(telemetry::PKTS_ADMITTED_TOTAL, "kind" => kind.as_str()).increment(1);
        if log && let Some(collector) = &mut self.collector {
            collector.record_pkt_admitted(node, kind);
        }
    }

    pub fn record_pkt_rejected(&mut self, node: NodeId, kind: PacketKind, log: bool) {
        counter!(telemetry::PKTS_REJECTED_TOTAL, "kind" => kind.as_str()).increment(1);
        if log && let Some(collector) = &mut self.collector {
            collector.record_pkt_rejected(node, kind);
        }
    }

    /// Sample the current queue length at `node` for the collector.
    pub fn report_cache_queue_size(&mut self, node: NodeId, kind: PacketKind, log: bool) {
        let len = self.model.scheduler.cache_queue_len(node);
        if log && let Some(collector) = &mut self.collector {
            collector.report_cache_queue_size(node, kind, len);
        }
    }

    /// Report the queueing delay charged to an admitted cache op.
    pub fn cache_operation_flow(&mut self, flow: FlowId, delay: f64, log: bool) {
        if log && let Some(collector) = &mut self.collector {
            collector.cache_operation_flow(flow, delay);
        }
    }

    // ------------------------------------------------------------------
    // Per-flow strategy scratch
    // ------------------------------------------------------------------

    pub fn set_lcd_copied(&mut self, flow: FlowId, copied: bool) {
        self.model.scratch.entry(flow).or_default().lcd_copied = copied;
    }

    /// Reset the ProbCache request-path accumulators (`c`, `N`).
    pub fn start_probcache_counters(&mut self, flow: FlowId) {
        let scratch = self.model.scratch.entry(flow).or_default();
        scratch.pc_c = 0;
        scratch.pc_n = 0;
    }

    pub fn add_probcache_c(&mut self, flow: FlowId) {
        self.model.scratch.entry(flow).or_default().pc_c += 1;
    }

    pub fn add_probcache_n(&mut self, flow: FlowId, n: u64) {
        self.model.scratch.entry(flow).or_default().pc_n += n;
    }

    pub fn subtract_probcache_n(&mut self, flow: FlowId, n: u64) {
        let scratch = self.model.scratch.entry(flow).or_default();
        scratch.pc_n = scratch.pc_n.saturating_sub(n);
    }

    pub fn start_probcache_x(&mut self, flow: FlowId) {
        self.model.scratch.entry(flow).or_default().pc_x = 0.0;
    }

    pub fn add_probcache_x(&mut self, flow: FlowId) {
        self.model.scratch.entry(flow).or_default().pc_x += 1.0;
    }

    /// Mark `node` busy for `flow` after a full-queue rejection.
    pub fn mark_busy_node(&mut self, flow: FlowId, node: NodeId) {
        self.model
            .scratch
            .entry(flow)
            .or_default()
            .busy_nodes
            .insert(node);
    }

    // ------------------------------------------------------------------
    // Session-level entry points
    // ------------------------------------------------------------------
    //
    // Session strategies walk an entire retrieval inside one call, so the
    // controller scopes the flow context for them and reuses the flow
    // event stream toward the collector.

    pub fn start_session(
        &mut self,
        time: f64,
        receiver: NodeId,
        content: ContentId,
        flow: FlowId,
        log: bool,
    ) {
        self.session = Some(Session { content, flow, log });
        self.start_flow_session(time, receiver, content, flow, log);
    }

    pub fn end_session(&mut self, success: bool) {
        if let Some(session) = self.session.take() {
            self.end_flow_session(session.flow, session.log, success);
        }
    }

    pub fn forward_request_hop(&mut self, u: NodeId, v: NodeId) {
        if let Some(session) = &self.session {
            let (flow, log) = (session.flow, session.log);
            self.forward_request_hop_flow(u, v, flow, log);
        }
    }

    pub fn forward_content_hop(&mut self, u: NodeId, v: NodeId) {
        if let Some(session) = &self.session {
            let (flow, log) = (session.flow, session.log);
            self.forward_content_hop_flow(u, v, flow, log);
        }
    }

    /// Log request hops along the shortest path from `s` to `t`.
    pub fn forward_request_path(&mut self, s: NodeId, t: NodeId) {
        if let Some(path) = self.view().shortest_path(s, t).map(<[NodeId]>::to_vec) {
            for hop in path.windows(2) {
                self.forward_request_hop(hop[0], hop[1]);
            }
        }
    }

    /// Log content hops along `path`.
    pub fn forward_content_path(&mut self, path: &[NodeId]) {
        for hop in path.windows(2) {
            self.forward_content_hop(hop[0], hop[1]);
        }
    }

    /// Session-scoped [`get_content_flow`](Self::get_content_flow).
    pub fn get_content(&mut self, node: NodeId) -> bool {
        match &self.session {
            Some(session) => {
                let (content, flow, log) = (session.content, session.flow, session.log);
                self.get_content_flow(node, content, flow, log)
            }
            None => false,
        }
    }

    /// Session-scoped [`put_content_flow`](Self::put_content_flow).
    pub fn put_content(&mut self, node: NodeId) -> Option<ContentId> {
        match &self.session {
            Some(session) => {
                let (content, flow) = (session.content, session.flow);
                self.put_content_flow(node, content, flow)
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkModel;
    use crate::topology::Topology;
    use std::collections::HashMap;

    fn controller() -> Controller {
        let topo = Topology::path(3, 2.0).unwrap();
        let sizes = HashMap::from([(NodeId(1), 1)]);
        let contents = HashMap::from([(ContentId(1), NodeId(2))]);
        let model = NetworkModel::new(topo, sizes, contents, "LRU", 0).unwrap();
        Controller::new(model)
    }

    #[test]
    fn source_serves_without_a_cache() {
        let mut ctrl = controller();
        assert!(ctrl.get_content_flow(NodeId(2), ContentId(1), FlowId(0), false));
        // The source does not own other contents.
        assert!(!ctrl.get_content_flow(NodeId(2), ContentId(9), FlowId(0), false));
        // A receiver neither caches nor serves.
        assert!(!ctrl.get_content_flow(NodeId(0), ContentId(1), FlowId(0), false));
    }

    #[test]
    fn cache_roundtrip_through_controller() {
        let mut ctrl = controller();
        assert!(!ctrl.get_content_flow(NodeId(1), ContentId(1), FlowId(0), false));
        assert_eq!(ctrl.put_content_flow(NodeId(1), ContentId(1), FlowId(0)), None);
        assert!(ctrl.get_content_flow(NodeId(1), ContentId(1), FlowId(0), false));
        // Size-1 cache evicts on the next insertion.
        assert_eq!(
            ctrl.put_content_flow(NodeId(1), ContentId(2), FlowId(0)),
            Some(ContentId(1))
        );
    }

    #[test]
    fn scratch_lifecycle_follows_the_flow() {
        let mut ctrl = controller();
        let flow = FlowId(7);
        ctrl.set_lcd_copied(flow, true);
        ctrl.add_probcache_c(flow);
        ctrl.add_probcache_n(flow, 5);
        ctrl.mark_busy_node(flow, NodeId(1));
        assert!(ctrl.view().lcd_copied(flow));
        assert_eq!(ctrl.view().probcache_c(flow), 1);
        assert_eq!(ctrl.view().probcache_n(flow), 5);
        assert!(ctrl.view().is_busy_node(flow, NodeId(1)));

        ctrl.end_flow_session(flow, false, true);
        assert!(!ctrl.view().lcd_copied(flow));
        assert_eq!(ctrl.view().probcache_n(flow), 0);
        assert!(!ctrl.view().is_busy_node(flow, NodeId(1)));
    }

    #[test]
    fn cache_lookup_is_non_mutating() {
        let mut ctrl = controller();
        ctrl.put_content_flow(NodeId(1), ContentId(1), FlowId(0));
        let before = ctrl.view().cache_dump(NodeId(1)).unwrap();
        assert_eq!(ctrl.view().cache_lookup(NodeId(1), ContentId(1)), Some(true));
        assert_eq!(ctrl.view().cache_lookup(NodeId(1), ContentId(9)), Some(false));
        // No cache at the receiver.
        assert_eq!(ctrl.view().cache_lookup(NodeId(0), ContentId(1)), None);
        assert_eq!(ctrl.view().cache_dump(NodeId(1)).unwrap(), before);
    }

    #[test]
    fn probcache_n_saturates_at_zero() {
        let mut ctrl = controller();
        let flow = FlowId(1);
        ctrl.add_probcache_n(flow, 3);
        ctrl.subtract_probcache_n(flow, 5);
        assert_eq!(ctrl.view().probcache_n(flow), 0);
    }

    #[test]
    fn cache_queue_delay_accumulates_service_times() {
        let mut ctrl = controller();
        let node = NodeId(1);
        // Empty queue, idle server.
        assert_eq!(ctrl.view().cache_queue_delay(node, 0.0), 0.0);

        // Pending ops, idle server: plain sum of service times.
        let ev = Event::get_content(10.0, NodeId(0), ContentId(1), node, FlowId(0), true);
        ctrl.add_cache_queue_event(node, ev.clone());
        assert_eq!(ctrl.view().cache_queue_delay(node, 10.0), 100.0);

        // Busy server: ceil(server.time + service(server) + queued - now).
        let served = ctrl.pop_next_cache_event(node).unwrap();
        ctrl.update_cache_queue_server(node, 10.0, served);
        ctrl.add_cache_queue_event(
            node,
            Event::put_content(12.0, NodeId(0), ContentId(2), node, FlowId(1), true),
        );
        // 10 + (100 + 100) - 12 = 198
        assert_eq!(ctrl.view().cache_queue_delay(node, 12.0), 198.0);
        // Far in the future the delay clamps to zero.
        assert_eq!(ctrl.view().cache_queue_delay(node, 1000.0), 0.0);
    }
}
