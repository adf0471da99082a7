//! Logging and Metrics

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use series_sanitizer::DefectReport;
use tracing::{warn, Level};

pub const UPLOADS_TOTAL: &str = "spike_uploads_total";
pub const INVALID_VALUES_TOTAL: &str = "spike_invalid_values_total";
pub const ABNORMAL_VALUES_TOTAL: &str = "spike_abnormal_values_total";
pub const UPLOAD_ROWS: &str = "spike_upload_rows";
pub const EXPORT_ROWS_TOTAL: &str = "spike_export_rows_total";

/// Initialize logging
pub fn init_logging(
    level: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true);

    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

/// Install the global Prometheus recorder
///
/// Only one recorder can exist per process; later calls log and return `None`.
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!("Metrics recorder not installed: {}", err);
            None
        }
    }
}

/// Record the outcome of one sanitized upload
pub fn record_upload(rows: usize, report: &DefectReport) {
    counter!(UPLOADS_TOTAL).increment(1);
    counter!(INVALID_VALUES_TOTAL).increment(report.invalid_count as u64);
    counter!(ABNORMAL_VALUES_TOTAL).increment(report.abnormal_count as u64);
    histogram!(UPLOAD_ROWS).record(rows as f64);
}

/// Record rows written by an export
pub fn record_export(rows: usize) {
    counter!(EXPORT_ROWS_TOTAL).increment(rows as u64);
}
