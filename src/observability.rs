use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: slot queries served.
pub const SLOT_QUERIES_TOTAL: &str = "cadence_slot_queries_total";

/// Histogram: slot-query latency in seconds.
pub const SLOT_QUERY_DURATION_SECONDS: &str = "cadence_slot_query_duration_seconds";

/// Histogram: candidates returned per slot query.
pub const SLOTS_RETURNED: &str = "cadence_slots_returned";

/// Counter: live-status probes served.
pub const STATUS_PROBES_TOTAL: &str = "cadence_status_probes_total";

// ── Write-path metrics ──────────────────────────────────────────

/// Counter: successful profile writes (schedule, overrides, settings).
pub const PROFILE_WRITES_TOTAL: &str = "cadence_profile_writes_total";

/// Counter: writes rejected by optimistic concurrency.
pub const VERSION_CONFLICTS_TOTAL: &str = "cadence_version_conflicts_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
