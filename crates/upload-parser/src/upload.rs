//! Parsed Upload Model

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use series_sanitizer::Reading;
use std::path::Path;

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadFormat {
    Csv,
    Xlsx,
}

impl UploadFormat {
    /// Detect the format from the uploaded file name
    pub fn from_filename(name: &str) -> Result<Self, ParseError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(UploadFormat::Csv),
            Some("xlsx") => Ok(UploadFormat::Xlsx),
            _ => Err(ParseError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// One accepted row of an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRow {
    /// Timestamp exactly as it appeared in the file
    pub date_time: String,
    pub value: Option<f64>,
}

/// Rows extracted from an upload, in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedUpload {
    pub rows: Vec<UploadRow>,
    /// Rows dropped because their value was blank or not numeric
    pub missing_values: usize,
}

impl ParsedUpload {
    /// Accept a row when both timestamp and value are present
    pub(crate) fn push(&mut self, date_time: String, value: Option<f64>) {
        if date_time.is_empty() {
            return;
        }
        match value {
            Some(v) => self.rows.push(UploadRow {
                date_time,
                value: Some(v),
            }),
            None => self.missing_values += 1,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Readings in upload order, ready for sanitization
    pub fn readings(&self) -> Vec<Reading> {
        self.rows
            .iter()
            .enumerate()
            .map(|(position, row)| Reading::new(position, row.value))
            .collect()
    }
}

/// Parse a raw cell into a value, treating blanks and `-` as absent
pub fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
