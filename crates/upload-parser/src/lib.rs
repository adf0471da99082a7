//! Upload Parsing
//!
//! Turns uploaded CSV and XLSX files into ordered `(timestamp, value)` rows.

mod delimited;
mod error;
mod upload;
mod xlsx;

pub use delimited::{parse_csv, DATE_TIME_COLUMN, VALUE_COLUMN};
pub use error::ParseError;
pub use upload::{parse_value, ParsedUpload, UploadFormat, UploadRow};
pub use xlsx::{first_column_values, parse_xlsx, TIMESTAMP_FORMAT};

/// Parse an uploaded file, choosing the reader from its name
pub fn parse_upload(filename: &str, bytes: &[u8]) -> Result<ParsedUpload, ParseError> {
    match UploadFormat::from_filename(filename)? {
        UploadFormat::Csv => parse_csv(bytes),
        UploadFormat::Xlsx => parse_xlsx(bytes),
    }
}
