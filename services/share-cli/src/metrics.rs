//! Prometheus metrics dump
//!
//! With `--metrics` the CLI installs a Prometheus recorder before building the
//! client and prints the text exposition to stderr on exit. Counters emitted
//! by the libraries:
//!
//! - `share_http_attempts_total` (counter)
//! - `share_http_retries_total` (counter): label `reason`
//! - `dexcom_session_cache_lookups_total` (counter): label `result`
//! - `dexcom_authentications_total` (counter): label `step`
//! - `dexcom_session_renewals_total` (counter)
//! - `dexcom_readings_fetched_total` (counter)

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}
