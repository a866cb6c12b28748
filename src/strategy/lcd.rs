//! Leave Copy Down, packet level.
//!
//! One copy of the content is replicated only at the first caching node
//! below the serving node, toward the receiver. The per-flow
//! `lcd_copied` flag in the model's scratch guards the single copy.

use rand::rngs::StdRng;

use super::Strategy;
use crate::error::{Result, SimError};
use crate::model::Controller;
use crate::types::{Event, PacketKind};

/// `LCD_PKT_LEVEL`: plain packet-level LCD, cache operations are free.
#[derive(Debug, Default)]
pub struct LcdPacketLevel;

impl LcdPacketLevel {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LcdPacketLevel {
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
                    ctrl.set_lcd_copied(flow, false);
                    ctrl.start_flow_session(time, receiver, content, flow, log);
                }
                let source = ctrl
                    .view()
                    .content_source(content)
                    .ok_or(SimError::NoSource(content.0))?;
                if (ctrl.view().has_cache(node) || node == source)
                    && ctrl.get_content_flow(node, content, flow, log)
                {
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
                    ctrl.set_lcd_copied(flow, false);
                    ctrl.end_flow_session(flow, log, true);
                    return Ok(());
                }
                if ctrl.view().has_cache(node) && !ctrl.view().lcd_copied(flow) {
                    ctrl.put_content_flow(node, content, flow);
                    ctrl.set_lcd_copied(flow, true);
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

/// `LCD_PL_CD`: LCD over a bounded cache-service queue per node.
///
/// The single downstream copy becomes a queued write; the flag is set at
/// admission time so later hops of the same flow do not re-admit.
#[derive(Debug, Default)]
pub struct LcdPacketLevelCacheDelay;

impl LcdPacketLevelCacheDelay {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LcdPacketLevelCacheDelay {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        process_cache_delay_event(ctrl, ev, false)
    }
}

/// `LCD_AVOID_BUSY_NODE`: cache-delay LCD with per-flow busy-node
/// avoidance on the return path.
#[derive(Debug, Default)]
pub struct LcdPacketLevelAvoidBusyNode;

impl LcdPacketLevelAvoidBusyNode {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LcdPacketLevelAvoidBusyNode {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        process_cache_delay_event(ctrl, ev, true)
    }
}

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
                ctrl.set_lcd_copied(flow, false);
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
                ctrl.set_lcd_copied(flow, false);
                ctrl.end_flow_session_cache_delay(flow, log, true);
                return Ok(());
            }
            let busy = avoid_busy && ctrl.view().is_busy_node(flow, node);
            if ctrl.view().has_cache(node)
                && ctrl.view().cache_queue_len(node) < qmax
                && !ctrl.view().lcd_copied(flow)
                && !busy
            {
                ctrl.set_lcd_copied(flow, true);
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
                && !ctrl.view().lcd_copied(flow)
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
