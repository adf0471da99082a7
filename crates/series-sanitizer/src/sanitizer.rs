//! Sanitization Pipeline

use crate::corrector::{correct, CorrectorConfig};
use crate::normalizer::normalize;
use crate::Reading;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Defect counts produced by one sanitization call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectReport {
    /// Readings that were missing or sentinel-marked
    pub invalid_count: usize,
    /// Readings classified as outliers (normalized sentinels included)
    pub abnormal_count: usize,
}

/// Corrected values plus the defect report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanitizedSeries {
    pub values: Vec<f64>,
    pub report: DefectReport,
}

/// Normalize sentinels, then correct contextual outliers
pub fn sanitize(readings: &[Reading], config: &CorrectorConfig) -> SanitizedSeries {
    let normalized = normalize(readings);
    let corrected = correct(&normalized.values, config);

    let report = DefectReport {
        invalid_count: normalized.invalid_count,
        abnormal_count: corrected.abnormal_count,
    };

    debug!(
        len = readings.len(),
        invalid = report.invalid_count,
        abnormal = report.abnormal_count,
        "sanitized series"
    );

    SanitizedSeries {
        values: corrected.values,
        report,
    }
}

/// Reusable sanitizer holding a corrector configuration
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    config: CorrectorConfig,
}

impl Sanitizer {
    pub fn new(config: CorrectorConfig) -> Self {
        Self { config }
    }

    /// Sanitizer with the default window and a custom threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self::new(CorrectorConfig::with_threshold(threshold))
    }

    pub fn config(&self) -> &CorrectorConfig {
        &self.config
    }

    pub fn sanitize(&self, readings: &[Reading]) -> SanitizedSeries {
        sanitize(readings, &self.config)
    }
}
