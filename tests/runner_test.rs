//! Whole-run tests through the configuration surface.

use icnsim::SimError;
use icnsim::config::Config;
use icnsim::runner::{run_config, run_experiment};
use icnsim::tree::Tree;

fn packet_level_config(strategy: &str, workload: &str) -> Config {
    let toml = format!(
        r#"
        [[experiments]]
        [experiments.workload]
        name = "{workload}"
        n_contents = 50
        alpha = 1.0
        rate = 1.0
        n_warmup = 50
        n_measured = 200
        read_delay_penalty = 5.0
        write_delay_penalty = 5.0
        cache_queue_size = 4
        seed = 11

        [experiments.topology]
        name = "PATH"
        n = 6
        delay = 2.0

        [experiments.cache_placement]
        network_cache = 0.2

        [experiments.strategy]
        name = "{strategy}"
        "#
    );
    toml::from_str(&toml).unwrap()
}

fn session_config(strategy: &str) -> Config {
    let toml = format!(
        r#"
        [[experiments]]
        data_collectors = ["CACHE_HIT_RATIO", "LATENCY", "LINK_LOAD", "PATH_STRETCH"]

        [experiments.workload]
        name = "STATIONARY"
        n_contents = 50
        alpha = 1.0
        rate = 1.0
        n_warmup = 50
        n_measured = 200
        seed = 3

        [experiments.topology]
        name = "TREE"
        k = 2
        h = 3
        delay = 1.0

        [experiments.cache_placement]
        network_cache = 0.2

        [experiments.strategy]
        name = "{strategy}"
        "#
    );
    toml::from_str(&toml).unwrap()
}

fn assert_sane(results: &Tree, flows: f64) {
    let ratio = results.get_f64("CACHE_HIT_RATIO.MEAN").unwrap();
    assert!((0.0..=1.0).contains(&ratio), "hit ratio {ratio} out of range");
    let latency = results.get_f64("LATENCY.MEAN").unwrap();
    assert!(latency > 0.0, "latency {latency} not positive");
    assert_eq!(results.get_f64("LATENCY.FLOWS"), Some(flows));
}

#[test]
fn packet_level_strategies_run_to_completion() {
    for strategy in ["LCE_PKT_LEVEL", "LCD_PKT_LEVEL", "PROB_CACHE_PKT_LEVEL"] {
        let config = packet_level_config(strategy, "STATIONARY_PACKET_LEVEL");
        let results = run_experiment(&config.experiments[0]).unwrap();
        assert_sane(&results, 200.0);
    }
}

#[test]
fn cache_delay_strategies_run_to_completion() {
    for strategy in [
        "LCE_PL_CD",
        "LCD_PL_CD",
        "PROB_CACHE_PL_CD",
        "LCE_AVOID_BUSY_NODE",
        "LCD_AVOID_BUSY_NODE",
        "PROB_CACHE_AVOID_BUSY_NODE",
    ] {
        let mut config =
            packet_level_config(strategy, "STATIONARY_PACKET_LEVEL_CACHE_DELAY");
        config.experiments[0].data_collectors.push("CACHE_QUEUE".into());
        let results = run_experiment(&config.experiments[0]).unwrap();
        assert_sane(&results, 200.0);
        let rejection = results.get_f64("CACHE_QUEUE.REJECTION_RATIO").unwrap();
        assert!((0.0..=1.0).contains(&rejection));
    }
}

#[test]
fn session_strategies_run_to_completion() {
    for strategy in [
        "LCE",
        "LCD",
        "PROB_CACHE",
        "EDGE",
        "CL4M",
        "RAND_BERNOULLI",
        "RAND_CHOICE",
    ] {
        let config = session_config(strategy);
        let results = run_experiment(&config.experiments[0]).unwrap();
        assert_sane(&results, 200.0);
        let stretch = results.get_f64("PATH_STRETCH.MEAN").unwrap();
        assert!(stretch > 0.0 && stretch <= 1.0, "stretch {stretch}");
    }
}

#[test]
fn runs_are_deterministic_under_a_seed() {
    let config = packet_level_config("LCD_PKT_LEVEL", "STATIONARY_PACKET_LEVEL");
    let first = run_experiment(&config.experiments[0]).unwrap();
    let second = run_experiment(&config.experiments[0]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn different_seeds_differ() {
    let config = packet_level_config("LCD_PKT_LEVEL", "STATIONARY_PACKET_LEVEL");
    let mut reseeded = config.clone();
    reseeded.experiments[0].workload.seed = 12;
    let first = run_experiment(&config.experiments[0]).unwrap();
    let second = run_experiment(&reseeded.experiments[0]).unwrap();
    assert_ne!(first, second);
}

#[test]
fn partition_without_assignment_fails_at_setup() {
    let config = session_config("PARTITION");
    let err = run_experiment(&config.experiments[0]).unwrap_err();
    assert!(matches!(err, SimError::Topology(_)));
}

#[test]
fn run_config_produces_one_entry_per_experiment() {
    let mut config = packet_level_config("LCE_PKT_LEVEL", "STATIONARY_PACKET_LEVEL");
    let mut second = config.experiments[0].clone();
    second.strategy.name = "LCD_PKT_LEVEL".into();
    config.experiments.push(second);

    let set = run_config(&config).unwrap();
    assert_eq!(set.len(), 2);
    let labels: Vec<String> = set.iter().map(|entry| entry.label()).collect();
    assert!(labels[0].contains("LCE_PKT_LEVEL"));
    assert!(labels[1].contains("LCD_PKT_LEVEL"));
}

#[test]
fn cache_policies_are_interchangeable() {
    for policy in ["LRU", "LFU", "FIFO", "RAND", "NULL"] {
        let mut config = packet_level_config("LCE_PKT_LEVEL", "STATIONARY_PACKET_LEVEL");
        config.experiments[0].cache_policy.name = policy.into();
        let results = run_experiment(&config.experiments[0]).unwrap();
        let ratio = results.get_f64("CACHE_HIT_RATIO.MEAN").unwrap();
        if policy == "NULL" {
            // A cache that stores nothing can never hit.
            assert_eq!(ratio, 0.0);
        } else {
            assert!((0.0..=1.0).contains(&ratio));
        }
    }
}

#[test]
fn beta_skews_receivers_without_breaking_the_run() {
    let mut config = packet_level_config("LCE_PKT_LEVEL", "STATIONARY_PACKET_LEVEL");
    config.experiments[0].workload.beta = 0.8;
    // PATH has one receiver; use a tree so the skew has something to bias.
    config.experiments[0].topology = icnsim::config::TopologyConfig {
        name: "TREE".into(),
        n: None,
        k: Some(2),
        h: Some(3),
        delay: 1.0,
    };
    let results = run_experiment(&config.experiments[0]).unwrap();
    assert_sane(&results, 200.0);
}
