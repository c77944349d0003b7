//! Prometheus metrics exposition
//!
//! - `hubspot_oauth_callbacks_total` (counter): label `outcome`
//! - `hubspot_items_requests_total` (counter): label `outcome`
//! - `hubspot_vendor_request_duration_seconds` (histogram): label `endpoint`

//!
//! The contacts latency sample is recorded by `hubspot_crm::fetch_contacts`;
//! the token exchange is timed here.

use hubspot_auth::VENDOR_REQUEST_DURATION;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// 5ms to 30s, the configurable vendor timeout range
const VENDOR_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

pub(crate) fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(VENDOR_REQUEST_DURATION.to_string()),
        VENDOR_DURATION_BUCKETS,
    )
}

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(builder()?.install_recorder()?)
}

/// Build a recorder handle without installing it globally (tests, or a
/// second router in the same process).
pub fn local_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Record the outcome of an OAuth callback (`connected`, `rejected`, ...).
pub fn record_callback(outcome: &'static str) {
    metrics::counter!("hubspot_oauth_callbacks_total", "outcome" => outcome).increment(1);
}

/// Record the outcome of an items request.
pub fn record_items_request(outcome: &'static str) {
    metrics::counter!("hubspot_items_requests_total", "outcome" => outcome).increment(1);
}

/// Record how long a vendor call took.
pub fn record_vendor_duration(endpoint: &'static str, duration_secs: f64) {
    metrics::histogram!(VENDOR_REQUEST_DURATION, "endpoint" => endpoint).record(duration_secs);
}
