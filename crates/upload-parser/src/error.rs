//! Upload Parsing Error Types

use thiserror::Error;

/// Errors while extracting readings from an uploaded file
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// File extension is neither `.csv` nor `.xlsx`
    #[error("Unsupported file format.")]
    UnsupportedFormat(String),

    /// CSV bytes are not valid UTF-8
    #[error("Error decoding CSV file. Please check the file encoding and try again.")]
    Decode,

    /// Malformed CSV record
    #[error("Invalid CSV data: {0}")]
    Csv(String),

    /// Workbook could not be opened or read
    #[error("Error processing Excel file: {0}")]
    Workbook(String),
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Utf8 { .. } => ParseError::Decode,
            _ => ParseError::Csv(err.to_string()),
        }
    }
}

impl From<calamine::XlsxError> for ParseError {
    fn from(err: calamine::XlsxError) -> Self {
        ParseError::Workbook(err.to_string())
    }
}
