//! Session-level strategies.
//!
//! These walk an entire retrieval — request path to the first hit,
//! return path with the strategy's insertion rule — inside a single
//! `process_event` call. They are driven by the session-level workload:
//! each event is one request, and the packet kind must be `Request`.

use std::collections::HashMap;

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::Strategy;
use crate::error::{Result, SimError};
use crate::model::Controller;
use crate::topology::{Topology, betweenness, ego_betweenness, path_links};
use crate::types::{Event, NodeId, PacketKind};

/// Route a request along `path`, querying caches on the way.
///
/// Returns the serving node: the first caching node that hits, or the
/// last node of the path (the source), which is then asked directly.
fn route_request(ctrl: &mut Controller, path: &[NodeId]) -> Result<NodeId> {
    let Some(&last) = path.last() else {
        return Err(SimError::Topology("empty request path".into()));
    };
    for hop in path.windows(2) {
        let (u, v) = (hop[0], hop[1]);
        ctrl.forward_request_hop(u, v);
        if ctrl.view().has_cache(v) && ctrl.get_content(v) {
            return Ok(v);
        }
    }
    ctrl.get_content(last);
    Ok(last)
}

/// Return path from `serving` back to `receiver`: the reversed request
/// path prefix, so the content retraces the queried route.
fn return_path(ctrl: &Controller, receiver: NodeId, serving: NodeId) -> Result<Vec<NodeId>> {
    let mut path = ctrl
        .view()
        .shortest_path(receiver, serving)
        .ok_or_else(|| SimError::Topology(format!("no route from {receiver} to {serving}")))?
        .to_vec();
    path.reverse();
    Ok(path)
}

fn expect_request(ev: &Event) -> Result<()> {
    if ev.pkt_type == PacketKind::Request {
        Ok(())
    } else {
        Err(SimError::InvalidPacketKind(ev.pkt_type.as_str().into()))
    }
}

fn source_of(ctrl: &Controller, ev: &Event) -> Result<NodeId> {
    ctrl.view()
        .content_source(ev.content)
        .ok_or(SimError::NoSource(ev.content.0))
}

/// `LCE`: a copy at every cache on the return path.
#[derive(Debug, Default)]
pub struct LeaveCopyEverywhere;

impl LeaveCopyEverywhere {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LeaveCopyEverywhere {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        expect_request(ev)?;
        let source = source_of(ctrl, ev)?;
        let path = ctrl
            .view()
            .shortest_path(ev.receiver, source)
            .ok_or_else(|| SimError::Topology(format!("no route to {source}")))?
            .to_vec();
        ctrl.start_session(ev.time, ev.receiver, ev.content, ev.flow, ev.log);
        let serving = route_request(ctrl, &path)?;
        let back = return_path(ctrl, ev.receiver, serving)?;
        for (u, v) in path_links(&back) {
            ctrl.forward_content_hop(u, v);
            if ctrl.view().has_cache(v) {
                ctrl.put_content(v);
            }
        }
        ctrl.end_session(true);
        Ok(())
    }
}

/// `LCD`: one copy, at the first cache below the serving node.
#[derive(Debug, Default)]
pub struct LeaveCopyDown;

impl LeaveCopyDown {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LeaveCopyDown {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        expect_request(ev)?;
        let source = source_of(ctrl, ev)?;
        let path = ctrl
            .view()
            .shortest_path(ev.receiver, source)
            .ok_or_else(|| SimError::Topology(format!("no route to {source}")))?
            .to_vec();
        ctrl.start_session(ev.time, ev.receiver, ev.content, ev.flow, ev.log);
        let serving = route_request(ctrl, &path)?;
        let back = return_path(ctrl, ev.receiver, serving)?;
        let mut copied = false;
        for (u, v) in path_links(&back) {
            ctrl.forward_content_hop(u, v);
            if !copied && v != ev.receiver && ctrl.view().has_cache(v) {
                ctrl.put_content(v);
                copied = true;
            }
        }
        ctrl.end_session(true);
        Ok(())
    }
}

/// `PROB_CACHE`: probabilistic insertion weighted by remaining cache
/// capacity toward the source and distance from it.
#[derive(Debug)]
pub struct ProbCache {
    t_tw: f64,
}

impl ProbCache {
    pub fn new(t_tw: f64) -> Self {
        Self { t_tw }
    }
}

impl Strategy for ProbCache {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        expect_request(ev)?;
        let source = source_of(ctrl, ev)?;
        let path = ctrl
            .view()
            .shortest_path(ev.receiver, source)
            .ok_or_else(|| SimError::Topology(format!("no route to {source}")))?
            .to_vec();
        ctrl.start_session(ev.time, ev.receiver, ev.content, ev.flow, ev.log);
        let serving = route_request(ctrl, &path)?;
        let back = return_path(ctrl, ev.receiver, serving)?;
        let sizes: HashMap<NodeId, usize> = ctrl.view().cache_nodes().clone();
        let c = back.iter().filter(|n| sizes.contains_key(n)).count() as f64;
        let mut x = 0.0_f64;
        for hop in 1..back.len() {
            let (u, v) = (back[hop - 1], back[hop]);
            let n: usize = back[hop - 1..]
                .iter()
                .filter_map(|m| sizes.get(m).copied())
                .sum();
            if sizes.contains_key(&v) {
                x += 1.0;
            }
            ctrl.forward_content_hop(u, v);
            if v != ev.receiver
                && let Some(&size) = sizes.get(&v)
            {
                let prob = n as f64 / (self.t_tw * size as f64) * (x / c).powf(c);
                if rng.gen_range(0.0..1.0) < prob {
                    ctrl.put_content(v);
                }
            }
        }
        ctrl.end_session(true);
        Ok(())
    }
}

/// `PARTITION`: each receiver is statically mapped to one caching node;
/// all its requests go through that cache.
#[derive(Debug)]
pub struct Partition {
    cache_assignment: HashMap<NodeId, NodeId>,
}

impl Partition {
    pub fn new(topo: &Topology) -> Result<Self> {
        let cache_assignment = topo
            .cache_assignment()
            .ok_or_else(|| {
                SimError::Topology(
                    "PARTITION requires a cache_assignment on the topology".into(),
                )
            })?
            .clone();
        Ok(Self { cache_assignment })
    }
}

impl Strategy for Partition {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        expect_request(ev)?;
        let source = source_of(ctrl, ev)?;
        let cache = *self.cache_assignment.get(&ev.receiver).ok_or_else(|| {
            SimError::Topology(format!("receiver {} has no cache assignment", ev.receiver))
        })?;
        ctrl.start_session(ev.time, ev.receiver, ev.content, ev.flow, ev.log);
        ctrl.forward_request_path(ev.receiver, cache);
        if !ctrl.get_content(cache) {
            ctrl.forward_request_path(cache, source);
            ctrl.get_content(source);
            let down = ctrl
                .view()
                .shortest_path(source, cache)
                .ok_or_else(|| SimError::Topology(format!("no route to {cache}")))?
                .to_vec();
            ctrl.forward_content_path(&down);
            ctrl.put_content(cache);
        }
        let home = ctrl
            .view()
            .shortest_path(cache, ev.receiver)
            .ok_or_else(|| SimError::Topology(format!("no route to {}", ev.receiver)))?
            .to_vec();
        ctrl.forward_content_path(&home);
        ctrl.end_session(true);
        Ok(())
    }
}

/// `EDGE`: only the first cache on the path is consulted; transit
/// caches are ignored.
#[derive(Debug, Default)]
pub struct Edge;

impl Edge {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for Edge {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        expect_request(ev)?;
        let source = source_of(ctrl, ev)?;
        let path = ctrl
            .view()
            .shortest_path(ev.receiver, source)
            .ok_or_else(|| SimError::Topology(format!("no route to {source}")))?
            .to_vec();
        ctrl.start_session(ev.time, ev.receiver, ev.content, ev.flow, ev.log);

        let mut edge_cache = None;
        let mut serving = source;
        let mut found = false;
        for (u, v) in path_links(&path) {
            ctrl.forward_request_hop(u, v);
            if ctrl.view().has_cache(v) {
                edge_cache = Some(v);
                if ctrl.get_content(v) {
                    serving = v;
                } else {
                    ctrl.forward_request_path(v, source);
                    ctrl.get_content(source);
                    serving = source;
                }
                found = true;
                break;
            }
        }
        if !found {
            // No caches anywhere on the path.
            ctrl.get_content(source);
            serving = source;
        }

        let back = return_path(ctrl, ev.receiver, serving)?;
        ctrl.forward_content_path(&back);
        if serving == source
            && let Some(cache) = edge_cache
        {
            ctrl.put_content(cache);
        }
        ctrl.end_session(true);
        Ok(())
    }
}

/// `CL4M` (cache less for more): one copy, at the return-path node with
/// the greatest betweenness centrality; ties go to the node closest to
/// the receiver.
#[derive(Debug)]
pub struct CacheLessForMore {
    betw: HashMap<NodeId, f64>,
}

impl CacheLessForMore {
    pub fn new(topo: &Topology, use_ego_betw: bool) -> Self {
        let betw = if use_ego_betw {
            ego_betweenness(topo)
        } else {
            betweenness(topo)
        };
        Self { betw }
    }
}

impl Strategy for CacheLessForMore {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        _rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        expect_request(ev)?;
        let source = source_of(ctrl, ev)?;
        let path = ctrl
            .view()
            .shortest_path(ev.receiver, source)
            .ok_or_else(|| SimError::Topology(format!("no route to {source}")))?
            .to_vec();
        ctrl.start_session(ev.time, ev.receiver, ev.content, ev.flow, ev.log);
        let serving = route_request(ctrl, &path)?;
        let back = return_path(ctrl, ev.receiver, serving)?;

        let mut max_betw = -1.0_f64;
        let mut designated = None;
        for &v in back.iter().skip(1) {
            if ctrl.view().has_cache(v)
                && let Some(&b) = self.betw.get(&v)
                && b >= max_betw
            {
                max_betw = b;
                designated = Some(v);
            }
        }
        for (u, v) in path_links(&back) {
            ctrl.forward_content_hop(u, v);
            if designated == Some(v) {
                ctrl.put_content(v);
            }
        }
        ctrl.end_session(true);
        Ok(())
    }
}

/// `RAND_BERNOULLI`: insert at each return-path cache with probability `p`.
#[derive(Debug)]
pub struct RandomBernoulli {
    p: f64,
}

impl RandomBernoulli {
    pub fn new(p: f64) -> Self {
        Self { p }
    }
}

impl Strategy for RandomBernoulli {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        expect_request(ev)?;
        let source = source_of(ctrl, ev)?;
        let path = ctrl
            .view()
            .shortest_path(ev.receiver, source)
            .ok_or_else(|| SimError::Topology(format!("no route to {source}")))?
            .to_vec();
        ctrl.start_session(ev.time, ev.receiver, ev.content, ev.flow, ev.log);
        let serving = route_request(ctrl, &path)?;
        let back = return_path(ctrl, ev.receiver, serving)?;
        for (u, v) in path_links(&back) {
            ctrl.forward_content_hop(u, v);
            if v != ev.receiver
                && ctrl.view().has_cache(v)
                && rng.gen_range(0.0..1.0) < self.p
            {
                ctrl.put_content(v);
            }
        }
        ctrl.end_session(true);
        Ok(())
    }
}

/// `RAND_CHOICE`: insert at exactly one return-path cache, chosen
/// uniformly at random.
#[derive(Debug, Default)]
pub struct RandomChoice;

impl RandomChoice {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for RandomChoice {
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()> {
        expect_request(ev)?;
        let source = source_of(ctrl, ev)?;
        let path = ctrl
            .view()
            .shortest_path(ev.receiver, source)
            .ok_or_else(|| SimError::Topology(format!("no route to {source}")))?
            .to_vec();
        ctrl.start_session(ev.time, ev.receiver, ev.content, ev.flow, ev.log);
        let serving = route_request(ctrl, &path)?;
        let back = return_path(ctrl, ev.receiver, serving)?;
        // Interior nodes only: neither the serving node nor the receiver.
        let interior = if back.len() > 2 { &back[1..back.len() - 1] } else { &[] };
        let caches: Vec<NodeId> = interior
            .iter()
            .copied()
            .filter(|&v| ctrl.view().has_cache(v))
            .collect();
        let designated = caches.choose(rng).copied();
        for (u, v) in path_links(&back) {
            ctrl.forward_content_hop(u, v);
            if designated == Some(v) {
                ctrl.put_content(v);
            }
        }
        ctrl.end_session(true);
        Ok(())
    }
}
