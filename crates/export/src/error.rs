//! Export Error Types

use thiserror::Error;

/// Errors while preparing an export
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// Date input did not match the expected format
    #[error("Invalid date format. Please use YYYY-MM-DD format.")]
    InvalidDate(String),

    /// Stored timestamp could not be read as `DD/MM/YYYY HH:MM`
    #[error("Stored timestamp {0:?} is not in DD/MM/YYYY HH:MM format")]
    InvalidTimestamp(String),

    /// CSV writer failure
    #[error("CSV write error: {0}")]
    Csv(String),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}
