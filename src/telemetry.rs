//! Telemetry metric name constants.
//!
//! Centralised metric names for engine operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! These counters are ambient process telemetry, not simulation results:
//! measured quantities (hit ratios, latencies, rejection rates) flow
//! through the [`Collector`](crate::collect::Collector) event stream.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `icnsim_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `kind` — packet kind ("Request" | "Data" | "get_content" | "put_content")

/// Total events dispatched by the drivers, across both heaps.
///
/// Labels: `kind`.
pub const EVENTS_DISPATCHED_TOTAL: &str = "icnsim_events_dispatched_total";

/// Total flows injected by the workload drivers.
pub const FLOWS_STARTED_TOTAL: &str = "icnsim_flows_started_total";

/// Total flows that reached their receiver.
pub const FLOWS_COMPLETED_TOTAL: &str = "icnsim_flows_completed_total";

/// Total cache lookups that hit.
pub const CACHE_HITS_TOTAL: &str = "icnsim_cache_hits_total";

/// Total cache lookups that missed.
pub const CACHE_MISSES_TOTAL: &str = "icnsim_cache_misses_total";

/// Total lookups answered by a content source.
pub const SERVER_HITS_TOTAL: &str = "icnsim_server_hits_total";

/// Total cache operations admitted to a cache-service queue.
///
/// Labels: `kind`.
pub const PKTS_ADMITTED_TOTAL: &str = "icnsim_pkts_admitted_total";

/// Total cache operations rejected by a full cache-service queue.
///
/// Labels: `kind`.
pub const PKTS_REJECTED_TOTAL: &str = "icnsim_pkts_rejected_total";
