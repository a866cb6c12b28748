//! Caching strategies.
//!
//! A strategy is the state machine that moves packets through the
//! network: given one dispatched event it executes the node-local
//! transition and pushes the follow-up event(s) through the controller.
//! Strategies keep no state of their own across events beyond their
//! tuning constants — anything per-flow lives in the model's flow
//! scratch, anything global in the model itself.
//!
//! Two families share the trait:
//!
//! - **Packet-level** strategies (`*_PKT_LEVEL`, `*_PL_CD`,
//!   `*_AVOID_BUSY_NODE`) see every hop as its own event and drive the
//!   two-heap scheduler.
//! - **Session-level** strategies (`LCE`, `LCD`, `PROB_CACHE`,
//!   `PARTITION`, `EDGE`, `CL4M`, `RAND_BERNOULLI`, `RAND_CHOICE`) walk
//!   an entire retrieval inside one call.
//!
//! The registry name in the configuration maps to a constructor via
//! [`build_strategy`].

mod lce;
mod lcd;
mod probcache;
mod session;

pub use lce::{LcePacketLevel, LcePacketLevelAvoidBusyNode, LcePacketLevelCacheDelay};
pub use lcd::{LcdPacketLevel, LcdPacketLevelAvoidBusyNode, LcdPacketLevelCacheDelay};
pub use probcache::{
    ProbCachePacketLevel, ProbCachePacketLevelAvoidBusyNode, ProbCachePacketLevelCacheDelay,
};
pub use session::{
    CacheLessForMore, Edge, LeaveCopyDown, LeaveCopyEverywhere, Partition, ProbCache,
    RandomBernoulli, RandomChoice,
};

use rand::rngs::StdRng;

use crate::config::StrategyConfig;
use crate::error::{Result, SimError};
use crate::model::Controller;
use crate::topology::Topology;
use crate::types::Event;

/// A caching strategy's event-driven transition function.
pub trait Strategy {
    /// Execute the node-local transition for one dispatched event.
    fn process_event(
        &mut self,
        ctrl: &mut Controller,
        rng: &mut StdRng,
        ev: &Event,
    ) -> Result<()>;
}

impl std::fmt::Debug for dyn Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Strategy")
    }
}

/// Registry names of the packet-level strategies.
const PACKET_LEVEL: &[&str] = &[
    "LCE_PKT_LEVEL",
    "LCD_PKT_LEVEL",
    "PROB_CACHE_PKT_LEVEL",
    "LCE_PL_CD",
    "LCD_PL_CD",
    "PROB_CACHE_PL_CD",
    "LCE_AVOID_BUSY_NODE",
    "LCD_AVOID_BUSY_NODE",
    "PROB_CACHE_AVOID_BUSY_NODE",
];

/// Registry names of the session-level strategies.
const SESSION_LEVEL: &[&str] = &[
    "LCE",
    "LCD",
    "PROB_CACHE",
    "PARTITION",
    "EDGE",
    "CL4M",
    "RAND_BERNOULLI",
    "RAND_CHOICE",
];

/// Whether `name` denotes a packet-level strategy.
pub fn is_packet_level(name: &str) -> bool {
    PACKET_LEVEL.contains(&name)
}

/// Whether `name` denotes any known strategy.
pub fn is_known_strategy(name: &str) -> bool {
    PACKET_LEVEL.contains(&name) || SESSION_LEVEL.contains(&name)
}

/// Build a strategy from its registry name and tuning parameters.
pub fn build_strategy(cfg: &StrategyConfig, topo: &Topology) -> Result<Box<dyn Strategy>> {
    match cfg.name.as_str() {
        "LCE_PKT_LEVEL" => Ok(Box::new(LcePacketLevel::new())),
        "LCE_PL_CD" => Ok(Box::new(LcePacketLevelCacheDelay::new())),
        "LCE_AVOID_BUSY_NODE" => Ok(Box::new(LcePacketLevelAvoidBusyNode::new())),
        "LCD_PKT_LEVEL" => Ok(Box::new(LcdPacketLevel::new())),
        "LCD_PL_CD" => Ok(Box::new(LcdPacketLevelCacheDelay::new())),
        "LCD_AVOID_BUSY_NODE" => Ok(Box::new(LcdPacketLevelAvoidBusyNode::new())),
        "PROB_CACHE_PKT_LEVEL" => Ok(Box::new(ProbCachePacketLevel::new(cfg.t_tw))),
        "PROB_CACHE_PL_CD" => Ok(Box::new(ProbCachePacketLevelCacheDelay::new(cfg.t_tw))),
        "PROB_CACHE_AVOID_BUSY_NODE" => {
            Ok(Box::new(ProbCachePacketLevelAvoidBusyNode::new(cfg.t_tw)))
        }
        "LCE" => Ok(Box::new(LeaveCopyEverywhere::new())),
        "LCD" => Ok(Box::new(LeaveCopyDown::new())),
        "PROB_CACHE" => Ok(Box::new(ProbCache::new(cfg.t_tw))),
        "PARTITION" => Ok(Box::new(Partition::new(topo)?)),
        "EDGE" => Ok(Box::new(Edge::new())),
        "CL4M" => Ok(Box::new(CacheLessForMore::new(topo, cfg.use_ego_betw))),
        "RAND_BERNOULLI" => Ok(Box::new(RandomBernoulli::new(cfg.p))),
        "RAND_CHOICE" => Ok(Box::new(RandomChoice::new())),
        other => Err(SimError::Config(format!("unknown strategy '{other}'"))),
    }
}
