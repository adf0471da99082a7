//! CSV Export Writer

use crate::error::ExportError;
use chrono::NaiveDateTime;
use storage::SpikeRecord;
use tracing::debug;

/// Timestamp layout of stored and exported records
pub const RECORD_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";
/// Download name for the export
pub const EXPORT_FILENAME: &str = "spike_data.csv";

/// Floats keep a decimal point (`10.0`); absent values are empty
fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

/// Serialize records as `dateTime,value` CSV
pub fn write_csv(records: &[SpikeRecord]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["dateTime", "value"])?;

    for record in records {
        let timestamp = NaiveDateTime::parse_from_str(record.date_time.trim(), RECORD_TIMESTAMP_FORMAT)
            .map_err(|_| ExportError::InvalidTimestamp(record.date_time.clone()))?;

        writer.write_record([
            timestamp.format(RECORD_TIMESTAMP_FORMAT).to_string(),
            format_value(record.value),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Csv(err.to_string()))?;
    debug!(rows = records.len(), bytes = bytes.len(), "wrote CSV export");

    String::from_utf8(bytes).map_err(|err| ExportError::Csv(err.to_string()))
}
