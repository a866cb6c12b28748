//! Traffic workloads and the event-dispatch drivers.
//!
//! A workload turns the configuration into a stream of request arrivals:
//! Poisson in time, Zipf over contents, uniform (or degree-skewed) over
//! receivers. The drivers own the run loop — they interleave workload
//! arrivals with already-scheduled events under the time discipline:
//!
//! - Every heap event strictly earlier than the next arrival is
//!   dispatched first, in nondecreasing time order.
//! - On equal times the link heap beats the cache-service heaps; within
//!   a heap, push order wins.
//! - A dispatched cache-service event moves into its node's server slot
//!   before the strategy processes it.
//! - The run ends when all flows have been injected and both heaps are
//!   empty.
//!
//! All randomness flows through one seedable generator passed in by the
//! caller; nothing draws from a global source.

use metrics::counter;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Exp, Zipf};
use tracing::debug;

use crate::config::WorkloadConfig;
use crate::error::{Result, SimError};
use crate::model::Controller;
use crate::strategy::Strategy;
use crate::telemetry;
use crate::topology::Topology;
use crate::types::{ContentId, Event, FlowId, NodeId};

/// How many flows pass between two reshuffles of the rank→content
/// permutation.
const RESHUFFLE_PERIOD: u64 = 1000;

/// The registered workload families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    /// `STATIONARY_PACKET_LEVEL`: packet-level, link heap only.
    PacketLevel,
    /// `STATIONARY_PACKET_LEVEL_CACHE_DELAY`: packet-level, both heaps.
    PacketLevelCacheDelay,
    /// `STATIONARY`: session-level, one event per request.
    Session,
}

impl WorkloadKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "STATIONARY_PACKET_LEVEL" => Ok(Self::PacketLevel),
            "STATIONARY_PACKET_LEVEL_CACHE_DELAY" => Ok(Self::PacketLevelCacheDelay),
            "STATIONARY" => Ok(Self::Session),
            other => Err(SimError::Config(format!("unknown workload '{other}'"))),
        }
    }

    pub fn is_packet_level(self) -> bool {
        matches!(self, Self::PacketLevel | Self::PacketLevelCacheDelay)
    }
}

/// Draws request arrivals: interarrival times, receivers, contents.
pub struct ArrivalProcess {
    exp: Exp<f64>,
    zipf: Zipf<f64>,
    receivers: Vec<NodeId>,
    receiver_dist: Option<Zipf<f64>>,
    // rank -> content permutation, reshuffled periodically (packet-level
    // workloads only); `positions[value - 1]` is the index of `value`.
    contents: Vec<u64>,
    positions: Vec<u64>,
    remap: bool,
}

impl ArrivalProcess {
    pub fn new(cfg: &WorkloadConfig, topo: &Topology, kind: WorkloadKind) -> Result<Self> {
        if cfg.alpha < 0.0 {
            return Err(SimError::Config(format!(
                "alpha must be nonnegative, got {}",
                cfg.alpha
            )));
        }
        if cfg.beta < 0.0 {
            return Err(SimError::Config(format!(
                "beta must be nonnegative, got {}",
                cfg.beta
            )));
        }
        if cfg.n_contents == 0 {
            return Err(SimError::Config("n_contents must be at least 1".into()));
        }
        let exp = Exp::new(cfg.rate)
            .map_err(|_| SimError::Config(format!("rate must be positive, got {}", cfg.rate)))?;
        let zipf = Zipf::new(cfg.n_contents, cfg.alpha)
            .map_err(|_| SimError::Config(format!("invalid alpha {}", cfg.alpha)))?;

        let mut receivers = topo.receivers().to_vec();
        let receiver_dist = if cfg.beta > 0.0 {
            // Receivers attached to better-connected PoPs request more:
            // sort by the degree of the attachment point, then draw the
            // rank from Zipf(beta).
            receivers.sort_by_key(|&r| {
                std::cmp::Reverse(topo.neighbors(r).next().map_or(0, |pop| topo.degree(pop)))
            });
            Some(
                Zipf::new(receivers.len() as u64, cfg.beta)
                    .map_err(|_| SimError::Config(format!("invalid beta {}", cfg.beta)))?,
            )
        } else {
            None
        };

        let contents: Vec<u64> = (1..=cfg.n_contents).collect();
        let positions = contents.clone();
        Ok(Self {
            exp,
            zipf,
            receivers,
            receiver_dist,
            contents,
            positions,
            remap: kind.is_packet_level(),
        })
    }

    /// Time until the next Poisson arrival.
    pub fn interarrival(&self, rng: &mut StdRng) -> f64 {
        self.exp.sample(rng)
    }

    /// Draw the receiver and content of flow number `flow`.
    pub fn next_request(&mut self, rng: &mut StdRng, flow: u64) -> Result<(NodeId, ContentId)> {
        let receiver = match &self.receiver_dist {
            None => self
                .receivers
                .choose(rng)
                .copied()
                .ok_or_else(|| SimError::Topology("no receivers".into()))?,
            Some(dist) => {
                let rank = dist.sample(rng) as usize;
                self.receivers[rank.saturating_sub(1).min(self.receivers.len() - 1)]
            }
        };
        let drawn = self.zipf.sample(rng) as u64;
        let content = if self.remap {
            if flow % RESHUFFLE_PERIOD == 0 {
                self.contents.shuffle(rng);
                for (index, &value) in self.contents.iter().enumerate() {
                    self.positions[(value - 1) as usize] = index as u64;
                }
            }
            // Position of the drawn rank in the current permutation.
            self.positions[(drawn - 1) as usize] + 1
        } else {
            drawn
        };
        Ok((receiver, ContentId(content)))
    }
}

fn dispatch(
    strategy: &mut dyn Strategy,
    ctrl: &mut Controller,
    rng: &mut StdRng,
    ev: &Event,
) -> Result<()> {
    counter!(telemetry::EVENTS_DISPATCHED_TOTAL, "kind" => ev.pkt_type.as_str()).increment(1);
    strategy.process_event(ctrl, rng, ev)
}

enum NextUp {
    Link,
    Cache(NodeId),
}

/// The earliest heap event strictly before `t_next`, honoring the
/// link-beats-cache tie rule. `None` when nothing is due.
fn next_due(ctrl: &Controller, t_next: f64, cache_delay: bool) -> Option<NextUp> {
    let view = ctrl.view();
    let link = view.peek_next_event().map(|ev| ev.time).filter(|&t| t < t_next);
    let cache = if cache_delay {
        view.peek_next_cache_event()
            .map(|ev| (ev.time, ev.node))
            .filter(|&(t, _)| t < t_next)
    } else {
        None
    };
    match (link, cache) {
        (Some(tl), Some((tc, node))) => {
            if tl <= tc {
                Some(NextUp::Link)
            } else {
                Some(NextUp::Cache(node))
            }
        }
        (Some(_), None) => Some(NextUp::Link),
        (None, Some((_, node))) => Some(NextUp::Cache(node)),
        (None, None) => None,
    }
}

/// Run a packet-level workload to completion.
///
/// `cache_delay` selects the two-heap discipline of the
/// `STATIONARY_PACKET_LEVEL_CACHE_DELAY` workload and seeds the model's
/// cache-service parameters from the configuration.
pub fn run_packet_level(
    ctrl: &mut Controller,
    strategy: &mut dyn Strategy,
    arrivals: &mut ArrivalProcess,
    cfg: &WorkloadConfig,
    rng: &mut StdRng,
    cache_delay: bool,
) -> Result<()> {
    if cache_delay {
        ctrl.configure_cache_queue(
            cfg.read_delay_penalty,
            cfg.write_delay_penalty,
            cfg.cache_queue_size,
        );
    }
    let total = cfg.n_warmup + cfg.n_measured;
    let mut flow = 0u64;
    let mut t_next = 0.0_f64;

    while flow < total || ctrl.view().has_pending_events() {
        t_next += arrivals.interarrival(rng);

        // Everything scheduled strictly before the next arrival goes first.
        while let Some(next) = next_due(ctrl, t_next, cache_delay) {
            match next {
                NextUp::Link => {
                    let ev = ctrl.pop_next_event()?;
                    dispatch(strategy, ctrl, rng, &ev)?;
                }
                NextUp::Cache(node) => {
                    let ev = ctrl.pop_next_cache_event(node)?;
                    ctrl.update_cache_queue_server(node, ev.time, ev.clone());
                    dispatch(strategy, ctrl, rng, &ev)?;
                }
            }
        }

        if flow >= total {
            continue;
        }
        let (receiver, content) = arrivals.next_request(rng, flow)?;
        if ctrl.view().content_source(content).is_none() {
            return Err(SimError::NoSource(content.0));
        }
        let log = flow >= cfg.n_warmup;
        let ev = Event::request(t_next, receiver, content, receiver, FlowId(flow), log);
        dispatch(strategy, ctrl, rng, &ev)?;
        flow += 1;
        if flow.is_multiple_of(10_000) {
            debug!(flow, t = t_next, "workload progress");
        }
    }
    Ok(())
}

/// Run a session-level workload: one strategy call per request, no heap
/// interleaving.
pub fn run_session_level(
    ctrl: &mut Controller,
    strategy: &mut dyn Strategy,
    arrivals: &mut ArrivalProcess,
    cfg: &WorkloadConfig,
    rng: &mut StdRng,
) -> Result<()> {
    let total = cfg.n_warmup + cfg.n_measured;
    let mut t = 0.0_f64;
    for req in 0..total {
        t += arrivals.interarrival(rng);
        let (receiver, content) = arrivals.next_request(rng, req)?;
        if ctrl.view().content_source(content).is_none() {
            return Err(SimError::NoSource(content.0));
        }
        let log = req >= cfg.n_warmup;
        let ev = Event::request(t, receiver, content, receiver, FlowId(req), log);
        dispatch(strategy, ctrl, rng, &ev)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn workload_config() -> WorkloadConfig {
        WorkloadConfig {
            name: "STATIONARY_PACKET_LEVEL".into(),
            n_contents: 100,
            alpha: 1.0,
            beta: 0.0,
            rate: 1.0,
            n_warmup: 10,
            n_measured: 20,
            read_delay_penalty: 100.0,
            write_delay_penalty: 100.0,
            cache_queue_size: 10,
            seed: 1,
        }
    }

    #[test]
    fn workload_names_resolve() {
        assert_eq!(
            WorkloadKind::from_name("STATIONARY_PACKET_LEVEL").unwrap(),
            WorkloadKind::PacketLevel
        );
        assert_eq!(
            WorkloadKind::from_name("STATIONARY_PACKET_LEVEL_CACHE_DELAY").unwrap(),
            WorkloadKind::PacketLevelCacheDelay
        );
        assert_eq!(
            WorkloadKind::from_name("STATIONARY").unwrap(),
            WorkloadKind::Session
        );
        assert!(WorkloadKind::from_name("GLOBETRAFF").is_err());
    }

    #[test]
    fn arrivals_are_deterministic_under_a_seed() {
        let topo = Topology::path(4, 1.0).unwrap();
        let cfg = workload_config();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut arrivals =
                ArrivalProcess::new(&cfg, &topo, WorkloadKind::PacketLevel).unwrap();
            (0..50)
                .map(|flow| arrivals.next_request(&mut rng, flow).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
        assert_ne!(draw(7), draw(8));
    }

    #[test]
    fn contents_stay_in_range() {
        let topo = Topology::path(4, 1.0).unwrap();
        let cfg = workload_config();
        let mut rng = StdRng::seed_from_u64(0);
        let mut arrivals = ArrivalProcess::new(&cfg, &topo, WorkloadKind::PacketLevel).unwrap();
        for flow in 0..5000 {
            let (receiver, content) = arrivals.next_request(&mut rng, flow).unwrap();
            assert!(content.0 >= 1 && content.0 <= cfg.n_contents);
            assert_eq!(receiver, NodeId(0));
        }
    }

    #[test]
    fn invalid_parameters_are_config_errors() {
        let topo = Topology::path(4, 1.0).unwrap();
        let mut cfg = workload_config();
        cfg.alpha = -0.5;
        assert!(ArrivalProcess::new(&cfg, &topo, WorkloadKind::PacketLevel).is_err());

        let mut cfg = workload_config();
        cfg.rate = 0.0;
        assert!(ArrivalProcess::new(&cfg, &topo, WorkloadKind::PacketLevel).is_err());

        let mut cfg = workload_config();
        cfg.beta = -1.0;
        assert!(ArrivalProcess::new(&cfg, &topo, WorkloadKind::PacketLevel).is_err());
    }

    #[test]
    fn interarrival_times_are_positive() {
        let topo = Topology::path(4, 1.0).unwrap();
        let cfg = workload_config();
        let arrivals = ArrivalProcess::new(&cfg, &topo, WorkloadKind::PacketLevel).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert!(arrivals.interarrival(&mut rng) > 0.0);
        }
    }
}
