//! Prometheus metrics exposition
//!
//! - `report_requests_total` (counter): labels `route`, `status`
//! - `report_request_duration_seconds` (histogram): label `route`
//! - `upstream_errors_total` (counter): label `entity`
//! - `token_refresh_total` (counter): label `outcome`, recorded by the
//!   token source in `quickbooks-auth`

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

const DURATION_METRIC: &str = "report_request_duration_seconds";

/// Bucket boundaries from 10ms to 30s. A report is one token exchange plus
/// four concurrent queries, so most land in the 0.25s–5s range.
const DURATION_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
}

/// Install the global recorder and return a handle for `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// In-process counters reported by `/health`.
#[derive(Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    /// Count a finished request; 4xx and 5xx also count as errors.
    pub fn observe(&self, route: &'static str, status: u16, started: Instant) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if status >= 400 {
            self.errors_total.fetch_add(1, Ordering::Relaxed);
        }
        record_request(route, status, started.elapsed().as_secs_f64());
    }
}

/// Record a completed request on one of the service routes.
pub fn record_request(route: &'static str, status: u16, duration_secs: f64) {
    metrics::counter!("report_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!(DURATION_METRIC, "route" => route).record(duration_secs);
}

/// Record a failed upstream query.
pub fn record_upstream_error(entity: &'static str) {
    metrics::counter!("upstream_errors_total", "entity" => entity).increment(1);
}
