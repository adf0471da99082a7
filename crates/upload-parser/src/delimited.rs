//! CSV Upload Reader

use crate::error::ParseError;
use crate::upload::{parse_value, ParsedUpload};
use tracing::{debug, warn};

/// Header of the timestamp column
pub const DATE_TIME_COLUMN: &str = "dateTime";
/// Header of the value column
pub const VALUE_COLUMN: &str = "value";

/// Extract `dateTime` / `value` rows from CSV bytes
///
/// Columns are located by header name. Rows missing either column, or
/// whose value is blank, `-` or not numeric, are dropped.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedUpload, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::Decode)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (date_col, value_col) = match (position(DATE_TIME_COLUMN), position(VALUE_COLUMN)) {
        (Some(d), Some(v)) => (d, v),
        _ => {
            warn!(headers = ?headers, "CSV upload lacks dateTime/value columns");
            return Ok(ParsedUpload::default());
        }
    };

    let mut upload = ParsedUpload::default();
    for record in reader.records() {
        let record = record?;
        let date_time = record.get(date_col).unwrap_or("").trim().to_string();
        let value = record.get(value_col).and_then(parse_value);
        upload.push(date_time, value);
    }

    debug!(
        rows = upload.len(),
        missing = upload.missing_values,
        "parsed CSV upload"
    );
    Ok(upload)
}
