use std::net::SocketAddr;

// ── Request-driven ──────────────────────────────────────────────

/// Counter: booking attempts. Labels: outcome.
pub const BOOKINGS_TOTAL: &str = "lodgr_bookings_total";

/// Histogram: booking latency in seconds, all outcomes.
pub const BOOKING_DURATION_SECONDS: &str = "lodgr_booking_duration_seconds";

/// Counter: house reads answered by the fast store.
pub const CACHE_HITS_TOTAL: &str = "lodgr_cache_hits_total";

/// Counter: house reads that fell through to the gateway.
pub const CACHE_MISSES_TOTAL: &str = "lodgr_cache_misses_total";

// ── Storage ─────────────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "lodgr_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "lodgr_wal_flush_batch_size";

/// Counter: completed WAL compactions.
pub const WAL_COMPACTIONS_TOTAL: &str = "lodgr_wal_compactions_total";

/// Install the Prometheus exporter on `port`. No-op if port is None.
pub fn init(port: Option<u16>) -> anyhow::Result<()> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
