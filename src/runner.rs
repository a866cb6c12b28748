//! Experiment orchestration: configuration in, results out.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::collect::build_collectors;
use crate::config::{Config, ExperimentConfig, TopologyConfig};
use crate::error::{Result, SimError};
use crate::model::{Controller, NetworkModel};
use crate::results::ResultSet;
use crate::strategy::build_strategy;
use crate::topology::{Topology, uniform_cache_placement, uniform_content_placement};
use crate::tree::Tree;
use crate::workload::{ArrivalProcess, WorkloadKind, run_packet_level, run_session_level};

/// Build the configured topology.
pub fn build_topology(cfg: &TopologyConfig) -> Result<Topology> {
    match cfg.name.as_str() {
        "PATH" => {
            let n = cfg
                .n
                .ok_or_else(|| SimError::Config("PATH topology requires 'n'".into()))?;
            Topology::path(n, cfg.delay)
        }
        "TREE" => {
            let k = cfg
                .k
                .ok_or_else(|| SimError::Config("TREE topology requires 'k'".into()))?;
            let h = cfg
                .h
                .ok_or_else(|| SimError::Config("TREE topology requires 'h'".into()))?;
            Topology::tree(k, h, cfg.delay)
        }
        other => Err(SimError::Config(format!("unknown topology '{other}'"))),
    }
}

/// Run one experiment to completion and return the collector results.
pub fn run_experiment(cfg: &ExperimentConfig) -> Result<Tree> {
    cfg.validate()?;
    let kind = WorkloadKind::from_name(&cfg.workload.name)?;
    let mut rng = StdRng::seed_from_u64(cfg.workload.seed);

    let topo = build_topology(&cfg.topology)?;
    let cache_sizes = uniform_cache_placement(
        &topo,
        cfg.workload.n_contents,
        cfg.cache_placement.network_cache,
    )?;
    let content_source =
        uniform_content_placement(&topo, cfg.workload.n_contents, &mut rng)?;

    let collectors = build_collectors(&cfg.data_collectors, &topo, &content_source)?;
    let mut strategy = build_strategy(&cfg.strategy, &topo)?;
    let mut arrivals = ArrivalProcess::new(&cfg.workload, &topo, kind)?;

    let model = NetworkModel::new(
        topo,
        cache_sizes,
        content_source,
        &cfg.cache_policy.name,
        cfg.workload.seed,
    )?;
    let mut ctrl = Controller::new(model);
    ctrl.attach_collector(collectors);

    info!(
        strategy = %cfg.strategy.name,
        workload = %cfg.workload.name,
        topology = %cfg.topology.name,
        flows = cfg.workload.n_warmup + cfg.workload.n_measured,
        "experiment starting"
    );

    match kind {
        WorkloadKind::PacketLevel => run_packet_level(
            &mut ctrl,
            strategy.as_mut(),
            &mut arrivals,
            &cfg.workload,
            &mut rng,
            false,
        )?,
        WorkloadKind::PacketLevelCacheDelay => run_packet_level(
            &mut ctrl,
            strategy.as_mut(),
            &mut arrivals,
            &cfg.workload,
            &mut rng,
            true,
        )?,
        WorkloadKind::Session => run_session_level(
            &mut ctrl,
            strategy.as_mut(),
            &mut arrivals,
            &cfg.workload,
            &mut rng,
        )?,
    }

    let results = ctrl
        .detach_collector()
        .map(|proxy| proxy.results())
        .unwrap_or_default();
    info!(strategy = %cfg.strategy.name, "experiment finished");
    Ok(results)
}

/// Run every experiment in a configuration, collecting a result set.
pub fn run_config(config: &Config) -> Result<ResultSet> {
    let mut set = ResultSet::new();
    for (index, experiment) in config.experiments.iter().enumerate() {
        let label = experiment.desc.clone().unwrap_or_else(|| {
            format!(
                "{}/{}",
                experiment.strategy.name, experiment.topology.name
            )
        });
        info!(index, %label, "running experiment");
        let results = run_experiment(experiment)?;
        set.push(experiment.params_tree(), results);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_both_topologies() {
        let path_cfg = TopologyConfig {
            name: "PATH".into(),
            n: Some(5),
            k: None,
            h: None,
            delay: 2.0,
        };
        assert_eq!(build_topology(&path_cfg).unwrap().node_count(), 5);

        let tree_cfg = TopologyConfig {
            name: "TREE".into(),
            n: None,
            k: Some(2),
            h: Some(2),
            delay: 1.0,
        };
        assert_eq!(build_topology(&tree_cfg).unwrap().node_count(), 7);
    }

    #[test]
    fn rejects_unknown_topology() {
        let cfg = TopologyConfig {
            name: "RING".into(),
            n: Some(5),
            k: None,
            h: None,
            delay: 1.0,
        };
        assert!(build_topology(&cfg).is_err());
    }
}
