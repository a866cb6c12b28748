//! Telemetry counter tests.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and
//! assert on emitted counters without a real exporter installed.

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use icnsim::config::Config;
use icnsim::runner::run_experiment;
use icnsim::telemetry;

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn small_config() -> Config {
    toml::from_str(
        r#"
        [[experiments]]
        [experiments.workload]
        name = "STATIONARY_PACKET_LEVEL"
        n_contents = 20
        alpha = 1.0
        n_warmup = 10
        n_measured = 40
        seed = 5

        [experiments.topology]
        name = "PATH"
        n = 4
        delay = 1.0

        [experiments.strategy]
        name = "LCE_PKT_LEVEL"
        "#,
    )
    .unwrap()
}

#[test]
fn a_run_emits_dispatch_and_flow_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        run_experiment(&small_config().experiments[0])
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();

    let started = counter_total(&snapshot, telemetry::FLOWS_STARTED_TOTAL);
    let completed = counter_total(&snapshot, telemetry::FLOWS_COMPLETED_TOTAL);
    assert_eq!(started, 50, "warmup + measured flows start");
    assert_eq!(completed, 50, "every flow completes");

    let dispatched = counter_total(&snapshot, telemetry::EVENTS_DISPATCHED_TOTAL);
    // Each flow takes at least a request and a data event.
    assert!(dispatched >= 100, "dispatched only {dispatched} events");

    let lookups = counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL)
        + counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL)
        + counter_total(&snapshot, telemetry::SERVER_HITS_TOTAL);
    assert!(lookups > 0);
}

#[test]
fn without_a_recorder_runs_still_succeed() {
    // Metric calls must be no-ops when no recorder is installed.
    assert!(run_experiment(&small_config().experiments[0]).is_ok());
}
