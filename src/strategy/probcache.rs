//! ProbCache, packet level.
//!
//! Content is cached probabilistically on the return path. On the
//! request direction the flow accumulates `c` (caching nodes visited)
//! and `N` (sum of their cache sizes); on the return direction each
//! caching node draws against
//!
//! ```text
//! p = N / (t_tw * cache_size(node)) * (x / c)^c
//! ```
//!
//! where `x` counts caching nodes already passed on the way down and
//! `t_tw` is the characteristic time controlling aggressiveness. `N`
//! shrinks as the content moves toward the receiver: after each hop the
//! size of the next caching node toward the source is subtracted.

use rand::Rng;
use rand::rngs::StdRng;

use super::Strategy;
use crate::error::{Result, SimError};
use crate::model::Controller;
use crate::types::{Event, PacketKind};

/// `PROB_CACHE_PKT_LEVEL`: plain packet-level ProbCache.
#[derive(Debug)]
pub struct ProbCachePacketLevel {
    t_tw: f64,
}

impl ProbCachePacketLevel {
    pub fn new(t_tw: f64) -> Self {
        Self { t_tw }
    }
}

impl Strategy for ProbCachePacketLevel {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        let Event {
            time,
            receiver,
            content,
            node,
            flow,
            log,
            ..
        } = *ev;
        match ev.pkt_type {
            PacketKind::Request => {
                if node == receiver {
                    ctrl.start_flow_session(time, receiver, content, flow, log);
                    ctrl.start_probcache_counters(flow);
                }
                let source = ctrl
                    .view()
                    .content_source(content)
                    .ok_or(SimError::NoSource(content.0))?;
                if (ctrl.view().has_cache(node) || node == source)
                    && ctrl.get_content_flow(node, content, flow, log)
                {
                    if let Some(size) = ctrl.view().cache_size(node) {
                        ctrl.add_probcache_c(flow);
                        ctrl.add_probcache_n(flow, size as u64);
                    }
                    let (next, delay) = ctrl.view().next_hop(node, receiver)?;
                    ctrl.forward_content_hop_flow(node, next, flow, log);
                    ctrl.start_probcache_x(flow);
                    ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
                    return Ok(());
                }
                let (next, delay) = ctrl.view().next_hop(node, source)?;
                ctrl.forward_request_hop_flow(node, next, flow, log);
                if let Some(size) = ctrl.view().cache_size(node) {
                    ctrl.add_probcache_c(flow);
                    ctrl.add_probcache_n(flow, size as u64);
                }
                ctrl.add_event(Event::request(
                    time + delay,
                    receiver,
                    content,
                    next,
                    flow,
                    log,
                ));
                Ok(())
            }
            PacketKind::Data => {
                if node == receiver {
                    ctrl.end_flow_session(flow, log, true);
                    return Ok(());
                }
                let source = ctrl
                    .view()
                    .content_source(content)
                    .ok_or(SimError::NoSource(content.0))?;
                let (next, delay) = ctrl.view().next_hop(node, receiver)?;
                let (next_to_source, _) = ctrl.view().next_hop(node, source)?;
                if let Some(size) = ctrl.view().cache_size(node) {
                    ctrl.add_probcache_x(flow);
                    let n = ctrl.view().probcache_n(flow) as f64;
                    let x = ctrl.view().probcache_x(flow);
                    let c = ctrl.view().probcache_c(flow) as f64;
                    let prob = n / (self.t_tw * size as f64) * (x / c).powf(c);
                    if rng.gen_range(0.0..1.0) < prob {
                        ctrl.put_content_flow(node, content, flow);
                    }
                }
                if let Some(next_size) = ctrl.view().cache_size(next_to_source) {
                    ctrl.subtract_probcache_n(flow, next_size as u64);
                }
                ctrl.forward_content_hop_flow(node, next, flow, log);
                ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
                Ok(())
            }
            other => Err(SimError::InvalidPacketKind(other.as_str().into())),
        }
    }
}

/// `PROB_CACHE_PL_CD`: ProbCache over a bounded cache-service queue —
/// the probability gate applies before admission, and a full queue sheds
/// the write.
#[derive(Debug)]
pub struct ProbCachePacketLevelCacheDelay {
    t_tw: f64,
}

impl ProbCachePacketLevelCacheDelay {
    pub fn new(t_tw: f64) -> Self {
        Self { t_tw }
    }
}

impl Strategy for ProbCachePacketLevelCacheDelay {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        process_cache_delay_event(ctrl, rng, ev, self.t_tw, false)
    }
}

/// `PROB_CACHE_AVOID_BUSY_NODE`: cache-delay ProbCache whose caching
/// probability is additionally scaled by the inverse of the local queue
/// length relative to all known queues, and which never caches at nodes
/// that already shed this flow's request.
#[derive(Debug)]
pub struct ProbCachePacketLevelAvoidBusyNode {
    t_tw: f64,
}

impl ProbCachePacketLevelAvoidBusyNode {
    pub fn new(t_tw: f64) -> Self {
        Self { t_tw }
    }
}

impl Strategy for ProbCachePacketLevelAvoidBusyNode {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        process_cache_delay_event(ctrl, rng, ev, self.t_tw, true)
    }
}

fn process_cache_delay_event(
    ctrl: &mut Controller,
    rng: &mut StdRng,
    ev: &Event,
    t_tw: f64,
    avoid_busy: bool,
) -> Result<()> {
    let Event {
        time,
        receiver,
        content,
        node,
        flow,
        log,
        ..
    } = *ev;
    let source = ctrl
        .view()
        .content_source(content)
        .ok_or(SimError::NoSource(content.0))?;
    let qmax = ctrl.view().cache_queue_capacity();
    match ev.pkt_type {
        PacketKind::Request => {
            if node == receiver {
                ctrl.start_flow_session(time, receiver, content, flow, log);
                ctrl.start_probcache_counters(flow);
            } else if ((ctrl.view().has_cache(node) && ctrl.view().cache_queue_len(node) < qmax)
                || node == source)
                && ctrl.get_content_flow(node, content, flow, log)
            {
                if let Some(size) = ctrl.view().cache_size(node) {
                    ctrl.add_probcache_c(flow);
                    ctrl.add_probcache_n(flow, size as u64);
                }
                if node == source {
                    let (next, delay) = ctrl.view().next_hop(node, receiver)?;
                    ctrl.forward_content_hop_flow(node, next, flow, log);
                    ctrl.start_probcache_x(flow);
                    ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
                } else {
                    let queue_delay = ctrl.view().cache_queue_delay(node, time);
                    ctrl.cache_operation_flow(flow, queue_delay, log);
                    ctrl.start_probcache_x(flow);
                    ctrl.add_cache_queue_event(
                        node,
                        Event::get_content(time + queue_delay, receiver, content, node, flow, log),
                    );
                    ctrl.report_cache_queue_size(node, PacketKind::Request, log);
                    ctrl.record_pkt_admitted(node, PacketKind::Request, log);
                }
                return Ok(());
            } else if ctrl.view().has_cache(node)
                && ctrl.view().cache_queue_len(node) >= qmax
                && ctrl.get_content_flow(node, content, flow, log)
            {
                ctrl.record_pkt_rejected(node, PacketKind::Request, log);
                if avoid_busy {
                    ctrl.mark_busy_node(flow, node);
                }
            }
            let (next, delay) = ctrl.view().next_hop(node, source)?;
            if let Some(size) = ctrl.view().cache_size(node) {
                ctrl.add_probcache_c(flow);
                ctrl.add_probcache_n(flow, size as u64);
            }
            ctrl.forward_request_hop_flow(node, next, flow, log);
            ctrl.add_event(Event::request(
                time + delay,
                receiver,
                content,
                next,
                flow,
                log,
            ));
            Ok(())
        }
        PacketKind::Data => {
            if node == receiver {
                ctrl.end_flow_session_cache_delay(flow, log, true);
                return Ok(());
            }
            let (next, delay) = ctrl.view().next_hop(node, receiver)?;
            let (next_to_source, _) = ctrl.view().next_hop(node, source)?;
            if let Some(size) = ctrl.view().cache_size(node) {
                ctrl.add_probcache_x(flow);
                let n = ctrl.view().probcache_n(flow) as f64;
                let x = ctrl.view().probcache_x(flow);
                let c = ctrl.view().probcache_c(flow) as f64;
                let prob = if avoid_busy {
                    // Down-weight nodes whose service queue is long
                    // relative to every queue the run has seen.
                    let qlen = ctrl.view().cache_queue_len(node).max(1);
                    let inv_q = 1.0 / qlen as f64;
                    let sum_inv: f64 = ctrl
                        .view()
                        .known_cache_queues()
                        .iter()
                        .map(|&(_, len)| 1.0 / len.max(1) as f64)
                        .sum();
                    let sum_inv = if sum_inv > 0.0 { sum_inv } else { 1.0 };
                    n / (t_tw * size as f64)
                        * ((c - x) / c * inv_q / sum_inv).powf(x)
                        * (x / c).powf(c - x)
                } else {
                    n / (t_tw * size as f64) * (x / c).powf(c)
                };
                let draw = rng.gen_range(0.0..1.0);
                let busy = avoid_busy && ctrl.view().is_busy_node(flow, node);
                if draw < prob && ctrl.view().cache_queue_len(node) < qmax && !busy {
                    let queue_delay = ctrl.view().cache_queue_delay(node, time);
                    ctrl.cache_operation_flow(flow, queue_delay, log);
                    ctrl.add_cache_queue_event(
                        node,
                        Event::put_content(time + queue_delay, receiver, content, node, flow, log),
                    );
                    ctrl.report_cache_queue_size(node, PacketKind::Data, log);
                    ctrl.record_pkt_admitted(node, PacketKind::Data, log);
                    if let Some(next_size) = ctrl.view().cache_size(next_to_source) {
                        ctrl.subtract_probcache_n(flow, next_size as u64);
                    }
                    return Ok(());
                } else if draw < prob
                    && (ctrl.view().cache_queue_len(node) >= qmax || busy)
                {
                    ctrl.record_pkt_rejected(node, PacketKind::Data, log);
                }
            }
            if let Some(next_size) = ctrl.view().cache_size(next_to_source) {
                ctrl.subtract_probcache_n(flow, next_size as u64);
            }
            ctrl.forward_content_hop_flow(node, next, flow, log);
            ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
            Ok(())
        }
        PacketKind::GetContent => {
            let (next, delay) = ctrl.view().next_hop(node, receiver)?;
            ctrl.forward_content_hop_flow(node, next, flow, log);
            ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
            Ok(())
        }
        PacketKind::PutContent => {
            ctrl.put_content_flow(node, content, flow);
            let (next, delay) = ctrl.view().next_hop(node, receiver)?;
            ctrl.forward_content_hop_flow(node, next, flow, log);
            ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
            Ok(())
        }
    }
}
