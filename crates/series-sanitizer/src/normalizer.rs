//! Invalid-Value Normalization
//!
//! Instruments report missing samples with sentinel values (`9999...` or
//! `-9999999...`). Detection is a prefix match on the decimal rendering of
//! the value, not a numeric range check.

use crate::Reading;
use serde::{Deserialize, Serialize};

const SENTINEL_PREFIX: &str = "9999";
const NEGATIVE_SENTINEL_PREFIX: &str = "-9999999";

/// Output of the normalization stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    /// Values with every invalid entry replaced by 0.0
    pub values: Vec<f64>,
    /// Number of entries that were replaced
    pub invalid_count: usize,
}

/// Check whether a textual value is a sentinel or blank
pub fn is_invalid_str(raw: &str) -> bool {
    raw.is_empty() || raw.starts_with(SENTINEL_PREFIX) || raw.starts_with(NEGATIVE_SENTINEL_PREFIX)
}

/// Check whether a numeric value renders as a sentinel
///
/// Integral values render with a trailing `.0` (`9999.0`), so the
/// rendering matches the textual form a reading was uploaded with.
pub fn is_sentinel(value: f64) -> bool {
    is_invalid_str(&format!("{value:?}"))
}

/// Check whether a reading value is missing or a sentinel
pub fn is_invalid(value: Option<f64>) -> bool {
    match value {
        Some(v) => is_sentinel(v),
        None => true,
    }
}

/// Replace every invalid reading with 0.0 and count the replacements
pub fn normalize(readings: &[Reading]) -> NormalizedSeries {
    let mut invalid_count = 0;

    let values = readings
        .iter()
        .map(|reading| match reading.value {
            Some(v) if !is_sentinel(v) => v,
            _ => {
                invalid_count += 1;
                0.0
            }
        })
        .collect();

    NormalizedSeries {
        values,
        invalid_count,
    }
}
