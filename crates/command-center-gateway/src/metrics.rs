//! Prometheus metrics recording and endpoint.

use std::sync::OnceLock;

use command_center_canvas::DeliveryReport;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus metrics recorder. Later calls reuse the first handle.
pub fn install_prometheus_recorder() -> anyhow::Result<()> {
    if HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = HANDLE.set(handle);
    Ok(())
}

/// Render the scrape body. Empty until the recorder is installed.
pub fn render() -> String {
    HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}

pub async fn metrics_handler() -> String {
    render()
}

/// Record a new canvas viewer.
pub fn record_viewer_connect() {
    metrics::gauge!("canvas_viewers_active").increment(1.0);
}

/// Record a canvas viewer going away.
pub fn record_viewer_disconnect() {
    metrics::gauge!("canvas_viewers_active").decrement(1.0);
}

/// Record the outcome of one broadcast pass.
pub fn record_broadcast(kind: &str, report: &DeliveryReport) {
    let labels = [("kind", kind.to_string())];
    metrics::counter!("canvas_broadcasts_total", &labels).increment(1);
    metrics::counter!("canvas_deliveries_total", &labels).increment(report.delivered as u64);
    metrics::counter!("canvas_viewers_pruned_total", &labels).increment(report.pruned as u64);
}
