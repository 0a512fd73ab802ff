//! Prometheus export and the domain counters Guardian records.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Later calls are no-ops, so test
/// binaries that build several routers share one recorder.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_login(outcome: &'static str) {
    counter!("guardian_logins_total", "outcome" => outcome).increment(1);
}

pub fn record_mfa_verification(outcome: &'static str) {
    counter!("guardian_mfa_verifications_total", "outcome" => outcome).increment(1);
}

pub fn record_report_filed(category: &str) {
    counter!("guardian_reports_filed_total", "category" => category.to_string()).increment(1);
}

pub fn record_file_upload(bytes: usize) {
    counter!("guardian_file_uploads_total").increment(1);
    counter!("guardian_file_upload_bytes_total").increment(bytes as u64);
}
