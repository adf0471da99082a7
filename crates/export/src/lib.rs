//! Spike Data Export
//!
//! Converts form dates into inclusive day bounds and serializes stored
//! records as `dateTime,value` CSV.

mod error;
mod range;
mod writer;

pub use error::ExportError;
pub use range::{parse_form_date, DateRange, DATE_FORMAT, FORM_DATE_FORMAT};
pub use writer::{write_csv, EXPORT_FILENAME, RECORD_TIMESTAMP_FORMAT};
