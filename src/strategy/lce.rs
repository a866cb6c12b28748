//! Leave Copy Everywhere, packet level.
//!
//! A copy of the content is replicated at every cache on the path from
//! the serving node back to the receiver.

use rand::rngs::StdRng;

use super::Strategy;
use crate::error::{Result, SimError};
use crate::model::Controller;
use crate::types::{Event, PacketKind};

/// `LCE_PKT_LEVEL`: plain packet-level LCE, cache operations are free.
#[derive(Debug, Default)]
pub struct LcePacketLevel;

impl LcePacketLevel {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LcePacketLevel {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
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
                }
                let source = ctrl
                    .view()
                    .content_source(content)
                    .ok_or(SimError::NoSource(content.0))?;
                if (ctrl.view().has_cache(node) || node == source)
                    && ctrl.get_content_flow(node, content, flow, log)
                {
                    // Turn around: the content heads back to the receiver.
                    let (next, delay) = ctrl.view().next_hop(node, receiver)?;
                    ctrl.forward_request_hop_flow(node, next, flow, log);
                    ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
                    return Ok(());
                }
                let (next, delay) = ctrl.view().next_hop(node, source)?;
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
                    ctrl.end_flow_session(flow, log, true);
                    return Ok(());
                }
                if ctrl.view().has_cache(node) {
                    ctrl.put_content_flow(node, content, flow);
                }
                let (next, delay) = ctrl.view().next_hop(node, receiver)?;
                ctrl.forward_content_hop_flow(node, next, flow, log);
                ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
                Ok(())
            }
            other => Err(SimError::InvalidPacketKind(other.as_str().into())),
        }
    }
}

/// `LCE_PL_CD`: LCE with a bounded cache-service queue per node.
///
/// Cache reads and writes consume queue capacity and service time; a
/// full queue sheds the operation — a cache-hit request then continues
/// toward the source as if it had missed, and a data packet passes
/// through uncached.
#[derive(Debug, Default)]
pub struct LcePacketLevelCacheDelay;

impl LcePacketLevelCacheDelay {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LcePacketLevelCacheDelay {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        process_cache_delay_event(ctrl, ev, false)
    }
}

/// `LCE_AVOID_BUSY_NODE`: cache-delay LCE that remembers, per flow,
/// which nodes shed its request and refuses to cache there on the way
/// back.
#[derive(Debug, Default)]
pub struct LcePacketLevelAvoidBusyNode;

impl LcePacketLevelAvoidBusyNode {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LcePacketLevelAvoidBusyNode {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        process_cache_delay_event(ctrl, ev, true)
    }
}

/// The shared LCE cache-delay transition; `avoid_busy` adds the
/// busy-node bookkeeping on top.
fn process_cache_delay_event(ctrl: &mut Controller, ev: &Event, avoid_busy: bool) -> Result<()> {
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
            } else if ((ctrl.view().has_cache(node) && ctrl.view().cache_queue_len(node) < qmax)
                || node == source)
                && ctrl.get_content_flow(node, content, flow, log)
            {
                if node == source {
                    let (next, delay) = ctrl.view().next_hop(node, receiver)?;
                    ctrl.forward_content_hop_flow(node, next, flow, log);
                    ctrl.add_event(Event::data(time + delay, receiver, content, next, flow, log));
                } else {
                    let queue_delay = ctrl.view().cache_queue_delay(node, time);
                    ctrl.cache_operation_flow(flow, queue_delay, log);
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
                // Load shedding: the content is here but the queue is
                // full, so the request is treated as a miss.
                ctrl.record_pkt_rejected(node, PacketKind::Request, log);
                if avoid_busy {
                    ctrl.mark_busy_node(flow, node);
                }
            }
            let (next, delay) = ctrl.view().next_hop(node, source)?;
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
            let busy = avoid_busy && ctrl.view().is_busy_node(flow, node);
            if ctrl.view().has_cache(node)
                && ctrl.view().cache_queue_len(node) < qmax
                && !busy
            {
                let queue_delay = ctrl.view().cache_queue_delay(node, time);
                ctrl.cache_operation_flow(flow, queue_delay, log);
                ctrl.add_cache_queue_event(
                    node,
                    Event::put_content(time + queue_delay, receiver, content, node, flow, log),
                );
                ctrl.report_cache_queue_size(node, PacketKind::Data, log);
                ctrl.record_pkt_admitted(node, PacketKind::Data, log);
                return Ok(());
            } else if ctrl.view().has_cache(node)
                && (ctrl.view().cache_queue_len(node) >= qmax || busy)
            {
                ctrl.record_pkt_rejected(node, PacketKind::Data, log);
            }
            let (next, delay) = ctrl.view().next_hop(node, receiver)?;
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
