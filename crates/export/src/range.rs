//! Export Date Ranges

use crate::error::ExportError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format submitted by the filter form
pub const FORM_DATE_FORMAT: &str = "%Y-%m-%d";
/// Date format remembered in the session and used in stored timestamps
pub const DATE_FORMAT: &str = "%d/%m/%Y";

const DAY_START: &str = "00:00";
const DAY_END: &str = "23:59";

/// Convert a `YYYY-MM-DD` form date into `DD/MM/YYYY`
pub fn parse_form_date(raw: &str) -> Result<String, ExportError> {
    NaiveDate::parse_from_str(raw.trim(), FORM_DATE_FORMAT)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .map_err(|_| ExportError::InvalidDate(raw.to_string()))
}

fn parse_stored_date(raw: &str) -> Result<NaiveDate, ExportError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ExportError::InvalidDate(raw.to_string()))
}

/// Inclusive timestamp bounds covering whole days
///
/// Bounds are `DD/MM/YYYY HH:MM` strings; storage compares them as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// `DD/MM/YYYY 00:00` of the first day
    pub start: Option<String>,
    /// `DD/MM/YYYY 23:59` of the last day
    pub end: Option<String>,
}

impl DateRange {
    /// Build bounds from session dates in `DD/MM/YYYY`; empty means unbounded
    pub fn from_session(start: &str, end: &str) -> Result<Self, ExportError> {
        let start = match start.trim() {
            "" => None,
            raw => Some(format!(
                "{} {DAY_START}",
                parse_stored_date(raw)?.format(DATE_FORMAT)
            )),
        };
        let end = match end.trim() {
            "" => None,
            raw => Some(format!(
                "{} {DAY_END}",
                parse_stored_date(raw)?.format(DATE_FORMAT)
            )),
        };

        Ok(Self { start, end })
    }
}
