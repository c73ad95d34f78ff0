//! Prometheus metrics handler
//!
//! Exposes `GET /metrics` in Prometheus text format, rendered from the
//! process-wide recorder installed at startup.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
}

/// `GET /metrics` (no auth)
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.handle.render(),
    )
}

/// Register descriptions for the booking counters so they show up with
/// `# HELP` lines even before the first increment.
pub fn describe_booking_metrics() {
    metrics::describe_counter!(
        "reservations_created_total",
        "Reservations accepted as pending"
    );
    metrics::describe_counter!(
        "reservation_conflicts_total",
        "Create or reschedule attempts rejected because the slot was taken"
    );
    metrics::describe_counter!(
        "reservations_cancelled_total",
        "Reservations moved to cancelled"
    );
    metrics::describe_counter!(
        "reservations_purged_total",
        "Cancelled reservations removed by purge"
    );
}
