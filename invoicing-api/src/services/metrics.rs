//! Metrics collection and Prometheus export.
//!
//! The recorder is installed once from `main`; until then every counter below
//! is a no-op, which keeps spawned test applications independent.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Metrics recorder already initialized"))
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_invoice_created(currency: &str) {
    counter!("invoicing_invoices_created_total", "currency" => currency.to_string()).increment(1);
}

pub fn record_invoice_view() {
    counter!("invoicing_invoice_views_total").increment(1);
}

pub fn record_access_token_collision() {
    counter!("invoicing_access_token_collisions_total").increment(1);
}
