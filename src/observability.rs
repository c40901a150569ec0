use std::net::SocketAddr;

use crate::engine::BookingError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: booking admission decisions. Labels: outcome.
pub const BOOKINGS_TOTAL: &str = "chairtime_bookings_total";

/// Histogram: booking admission latency in seconds, commit included.
pub const BOOKING_DURATION_SECONDS: &str = "chairtime_booking_duration_seconds";

/// Counter: appointment status transitions. Labels: status.
pub const TRANSITIONS_TOTAL: &str = "chairtime_transitions_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: non-cancelled appointments held in the store.
pub const APPOINTMENTS_ACTIVE: &str = "chairtime_appointments_active";

/// Gauge: inventory items below the low-stock threshold, refreshed on
/// every dashboard read.
pub const LOW_STOCK_ITEMS: &str = "chairtime_low_stock_items";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "chairtime_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "chairtime_wal_flush_batch_size";

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

/// Map an admission result to a short outcome label for metrics.
pub fn booking_outcome(result: &Result<crate::model::Appointment, BookingError>) -> &'static str {
    match result {
        Ok(_) => "committed",
        Err(e) => e.kind(),
    }
}
