//! icnsim - packet-level simulator for in-network caching strategies
//!
//! This crate models individual Request and Data packets traversing a
//! fixed topology of receivers, routers (each with a bounded cache and
//! a bounded cache-service queue) and content sources, executes a
//! configurable caching strategy (LCE, LCD and ProbCache families, with
//! cache-delay and busy-node-avoidance variants), and collects per-flow
//! metrics: cache hit ratio, end-to-end latency, queue rejection rates,
//! link load, path stretch.
//!
//! # Example
//!
//! ```rust,no_run
//! use icnsim::config::Config;
//! use icnsim::runner::run_config;
//!
//! fn main() -> icnsim::Result<()> {
//!     let config = Config::load(std::path::Path::new("sim.toml"))?;
//!     let results = run_config(&config)?;
//!     results.write(std::path::Path::new("results.json"))?;
//!     Ok(())
//! }
//! ```
//!
//! The engine is single-threaded and cooperatively scheduled: exactly
//! one event is dispatched at a time, in nondecreasing event-time order,
//! interleaving link arrivals, cache-service completions and new
//! workload requests. "Delay" is always simulated by pushing a
//! future-dated event — nothing blocks.

pub mod cache;
pub mod collect;
pub mod config;
pub mod error;
pub mod model;
pub mod results;
pub mod runner;
pub mod strategy;
pub mod telemetry;
pub mod topology;
pub mod tree;
pub mod types;
pub mod workload;

// Re-export the types most callers touch.
pub use error::{Result, SimError};
pub use model::{Controller, NetworkModel, View};
pub use types::{ContentId, Event, FlowId, NodeId, PacketKind};

/// Crate version, for CLI banners.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
