//! Experiment configuration.
//!
//! Configuration is TOML: one file holds one or more `[[experiments]]`
//! tables, each a complete scenario (workload, topology, placements,
//! cache policy, strategy, data collectors). Missing keys take the
//! documented defaults, so a minimal experiment is a handful of lines:
//!
//! ```toml
//! [[experiments]]
//! [experiments.workload]
//! name = "STATIONARY_PACKET_LEVEL"
//! n_contents = 1000
//! alpha = 1.0
//! n_warmup = 1000
//! n_measured = 4000
//!
//! [experiments.topology]
//! name = "PATH"
//! n = 10
//! delay = 2.0
//!
//! [experiments.strategy]
//! name = "LCE_PKT_LEVEL"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::strategy;
use crate::tree::Tree;
use crate::workload::WorkloadKind;

/// A configuration file: the experiment queue.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub experiments: Vec<ExperimentConfig>,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SimError::Config(format!("failed to read config file {path:?}: {e}"))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            SimError::Config(format!("failed to parse config file {path:?}: {e}"))
        })?;
        if config.experiments.is_empty() {
            return Err(SimError::Config(format!(
                "config file {path:?} defines no experiments"
            )));
        }
        for experiment in &config.experiments {
            experiment.validate()?;
        }
        Ok(config)
    }
}

/// One complete simulation scenario.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentConfig {
    pub workload: WorkloadConfig,
    pub topology: TopologyConfig,
    #[serde(default)]
    pub cache_placement: CachePlacementConfig,
    #[serde(default)]
    pub content_placement: ContentPlacementConfig,
    #[serde(default)]
    pub cache_policy: CachePolicyConfig,
    pub strategy: StrategyConfig,
    #[serde(default = "default_collectors")]
    pub data_collectors: Vec<String>,
    /// Free-form label carried into the result set.
    #[serde(default)]
    pub desc: Option<String>,
}

impl ExperimentConfig {
    /// Cross-field validation beyond what serde can express.
    pub fn validate(&self) -> Result<()> {
        let kind = WorkloadKind::from_name(&self.workload.name)?;
        if !strategy::is_known_strategy(&self.strategy.name) {
            return Err(SimError::Config(format!(
                "unknown strategy '{}'",
                self.strategy.name
            )));
        }
        if kind.is_packet_level() != strategy::is_packet_level(&self.strategy.name) {
            return Err(SimError::Config(format!(
                "workload '{}' and strategy '{}' operate at different granularities",
                self.workload.name, self.strategy.name
            )));
        }
        if self.workload.alpha < 0.0 {
            return Err(SimError::Config(format!(
                "alpha must be nonnegative, got {}",
                self.workload.alpha
            )));
        }
        if self.workload.beta < 0.0 {
            return Err(SimError::Config(format!(
                "beta must be nonnegative, got {}",
                self.workload.beta
            )));
        }
        if self.workload.rate <= 0.0 {
            return Err(SimError::Config(format!(
                "rate must be positive, got {}",
                self.workload.rate
            )));
        }
        if self.workload.n_contents == 0 {
            return Err(SimError::Config("n_contents must be at least 1".into()));
        }
        if self.workload.cache_queue_size == 0 {
            return Err(SimError::Config(
                "cache_queue_size must be at least 1".into(),
            ));
        }
        if !(self.cache_placement.network_cache > 0.0
            && self.cache_placement.network_cache <= 1.0)
        {
            return Err(SimError::Config(format!(
                "network_cache must be in (0, 1], got {}",
                self.cache_placement.network_cache
            )));
        }
        if self.cache_placement.name != "UNIFORM" {
            return Err(SimError::Config(format!(
                "unknown cache placement '{}'",
                self.cache_placement.name
            )));
        }
        if self.content_placement.name != "UNIFORM" {
            return Err(SimError::Config(format!(
                "unknown content placement '{}'",
                self.content_placement.name
            )));
        }
        self.topology.validate()?;
        Ok(())
    }

    /// The experiment's parameters as a tree, for keying result sets.
    pub fn params_tree(&self) -> Tree {
        Tree::from_serialize(self)
    }
}

/// Workload section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkloadConfig {
    pub name: String,
    pub n_contents: u64,
    pub alpha: f64,
    #[serde(default)]
    pub beta: f64,
    #[serde(default = "default_rate")]
    pub rate: f64,
    pub n_warmup: u64,
    pub n_measured: u64,
    #[serde(default = "default_delay_penalty")]
    pub read_delay_penalty: f64,
    #[serde(default = "default_delay_penalty")]
    pub write_delay_penalty: f64,
    #[serde(default = "default_cache_queue_size")]
    pub cache_queue_size: usize,
    #[serde(default)]
    pub seed: u64,
}

fn default_rate() -> f64 {
    1.0
}

fn default_delay_penalty() -> f64 {
    100.0
}

fn default_cache_queue_size() -> usize {
    10
}

/// Topology section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopologyConfig {
    pub name: String,
    /// PATH: number of nodes.
    #[serde(default)]
    pub n: Option<usize>,
    /// TREE: branching factor.
    #[serde(default)]
    pub k: Option<usize>,
    /// TREE: depth.
    #[serde(default)]
    pub h: Option<usize>,
    #[serde(default = "default_link_delay")]
    pub delay: f64,
}

fn default_link_delay() -> f64 {
    1.0
}

impl TopologyConfig {
    fn validate(&self) -> Result<()> {
        if self.delay <= 0.0 {
            return Err(SimError::Config(format!(
                "link delay must be positive, got {}",
                self.delay
            )));
        }
        match self.name.as_str() {
            "PATH" => {
                if self.n.is_none() {
                    return Err(SimError::Config("PATH topology requires 'n'".into()));
                }
            }
            "TREE" => {
                if self.k.is_none() || self.h.is_none() {
                    return Err(SimError::Config(
                        "TREE topology requires 'k' and 'h'".into(),
                    ));
                }
            }
            other => {
                return Err(SimError::Config(format!("unknown topology '{other}'")));
            }
        }
        Ok(())
    }
}

/// Cache placement section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CachePlacementConfig {
    #[serde(default = "default_uniform")]
    pub name: String,
    /// Fraction of `n_contents` distributed across routers.
    #[serde(default = "default_network_cache")]
    pub network_cache: f64,
}

impl Default for CachePlacementConfig {
    fn default() -> Self {
        Self {
            name: default_uniform(),
            network_cache: default_network_cache(),
        }
    }
}

fn default_uniform() -> String {
    "UNIFORM".to_string()
}

fn default_network_cache() -> f64 {
    0.1
}

/// Content placement section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentPlacementConfig {
    #[serde(default = "default_uniform")]
    pub name: String,
}

impl Default for ContentPlacementConfig {
    fn default() -> Self {
        Self {
            name: default_uniform(),
        }
    }
}

/// Cache policy section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CachePolicyConfig {
    #[serde(default = "default_policy")]
    pub name: String,
}

impl Default for CachePolicyConfig {
    fn default() -> Self {
        Self {
            name: default_policy(),
        }
    }
}

fn default_policy() -> String {
    "LRU".to_string()
}

/// Strategy section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    pub name: String,
    /// ProbCache characteristic time.
    #[serde(default = "default_t_tw")]
    pub t_tw: f64,
    /// RandomBernoulli insertion probability.
    #[serde(default = "default_bernoulli_p")]
    pub p: f64,
    /// CL4M: use ego-network betweenness instead of global betweenness.
    #[serde(default)]
    pub use_ego_betw: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            t_tw: default_t_tw(),
            p: default_bernoulli_p(),
            use_ego_betw: false,
        }
    }
}

fn default_t_tw() -> f64 {
    10.0
}

fn default_bernoulli_p() -> f64 {
    0.2
}

fn default_collectors() -> Vec<String> {
    vec!["CACHE_HIT_RATIO".to_string(), "LATENCY".to_string()]
}
