//! Prometheus metrics for the gateway

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::auth::AuthFailureKind;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

const METRIC_UPTIME: &str = "llm_gateway_uptime_seconds";
const METRIC_INFO: &str = "llm_gateway_info";
const METRIC_AUTH: &str = "llm_gateway_auth_total";
const METRIC_KEY_SET_FETCHES: &str = "llm_gateway_key_set_fetches_total";
const METRIC_URL_REPAIRS: &str = "llm_gateway_url_repairs_total";
const METRIC_COMPLETIONS: &str = "llm_gateway_completions_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();
    START_TIME.set(Instant::now()).ok();

    describe_gauge!(METRIC_UPTIME, "Gateway uptime in seconds");
    describe_gauge!(METRIC_INFO, "Gateway information (always 1)");
    describe_counter!(METRIC_AUTH, "Authentication attempts by outcome");
    describe_counter!(METRIC_KEY_SET_FETCHES, "JWKS fetches by outcome");
    describe_counter!(METRIC_URL_REPAIRS, "Requests whose embedded query was relocated");
    describe_counter!(METRIC_COMPLETIONS, "Completion requests by provider and status");

    gauge!(METRIC_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    if let Some(start) = START_TIME.get() {
        gauge!(METRIC_UPTIME).set(start.elapsed().as_secs_f64());
    }

    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record an authentication attempt; `None` means success.
pub fn record_auth_outcome(failure: Option<AuthFailureKind>) {
    let outcome = failure.map_or("success", AuthFailureKind::as_str);
    counter!(METRIC_AUTH, "outcome" => outcome).increment(1);
}

/// Record a JWKS fetch.
pub fn record_key_set_fetch(outcome: &'static str) {
    counter!(METRIC_KEY_SET_FETCHES, "outcome" => outcome).increment(1);
}

/// Record a relocated query string.
pub fn record_url_repair() {
    counter!(METRIC_URL_REPAIRS).increment(1);
}

/// Record a completion request.
pub fn record_completion(provider: &str, status: u16) {
    counter!(
        METRIC_COMPLETIONS,
        "provider" => provider.to_owned(),
        "status" => status.to_string(),
    )
    .increment(1);
}
