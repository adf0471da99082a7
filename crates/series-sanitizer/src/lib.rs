//! Series Sanitization
//!
//! Detects and corrects defects in uploaded sensor series. Sentinel and
//! missing readings are normalized to zero first, then every value that is
//! inconsistent with its 12-before / 12-after neighborhood (zeros included)
//! is replaced with the mean of its valid neighbors.

mod corrector;
mod normalizer;
mod sanitizer;
mod stats;

pub use corrector::{correct, is_abnormal, CorrectedSeries, CorrectorConfig};
pub use normalizer::{is_invalid, is_invalid_str, is_sentinel, normalize, NormalizedSeries};
pub use sanitizer::{sanitize, DefectReport, SanitizedSeries, Sanitizer};
pub use stats::WindowStats;

use serde::{Deserialize, Serialize};

/// A single raw reading in upload order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// 0-based offset in upload order
    pub position: usize,
    /// Parsed value; `None` when the cell was blank or unparseable
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(position: usize, value: Option<f64>) -> Self {
        Self { position, value }
    }
}

/// Build readings from raw values, numbering them in order
pub fn readings_from_values<I>(values: I) -> Vec<Reading>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .enumerate()
        .map(|(position, value)| Reading::new(position, value))
        .collect()
}
