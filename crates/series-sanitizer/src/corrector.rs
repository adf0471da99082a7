//! Contextual Outlier Correction
//!
//! Each position is judged against the 12 values before and after it. The
//! series handed to [`correct`] is treated as an immutable snapshot: both
//! classification and replacement read it, so a corrected value never feeds
//! into another position's statistics within the same pass.

use crate::normalizer::is_sentinel;
use crate::stats::{mean, WindowStats};
use serde::{Deserialize, Serialize};

/// Outlier corrector configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectorConfig {
    /// Allowed deviation from the window mean, in standard deviations
    pub threshold: f64,
    /// Neighbors considered on each side of a position
    pub half_window: usize,
    /// Minimum valid values a window needs before a position is judged
    pub min_context: usize,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            half_window: 12,
            min_context: 12,
        }
    }
}

impl CorrectorConfig {
    /// Default window with a custom threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }
}

/// Output of the correction stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectedSeries {
    pub values: Vec<f64>,
    /// Number of positions classified as abnormal
    pub abnormal_count: usize,
}

/// Sentinel flag for every value, computed once per pass
fn sentinel_mask(values: &[f64]) -> Vec<bool> {
    values.iter().map(|v| is_sentinel(*v)).collect()
}

/// Classify the value at `index` against its neighborhood
pub fn is_abnormal(values: &[f64], index: usize, config: &CorrectorConfig) -> bool {
    classify(values, &sentinel_mask(values), index, config)
}

fn classify(values: &[f64], sentinels: &[bool], index: usize, config: &CorrectorConfig) -> bool {
    let Some(&value) = values.get(index) else {
        return false;
    };

    if sentinels[index] {
        return false;
    }

    // No edge correction
    let half = config.half_window;
    if index < half || index + half >= values.len() {
        return false;
    }

    if value == 0.0 {
        return true;
    }

    let span = index - half..=index + half;
    let window: Vec<f64> = values[span.clone()]
        .iter()
        .zip(&sentinels[span])
        .filter(|(_, sentinel)| !**sentinel)
        .map(|(v, _)| *v)
        .collect();

    if window.len() < config.min_context {
        return false;
    }

    WindowStats::compute(&window).deviates(value, config.threshold)
}

/// Valid neighbors of `index`: up to `half` before, then up to `half` after
fn replacement_pool(values: &[f64], sentinels: &[bool], index: usize, half: usize) -> Vec<f64> {
    let before = index.saturating_sub(half)..index;
    let after = index + 1..values.len().min(index + half + 1);

    before
        .chain(after)
        .filter(|&i| !sentinels[i])
        .map(|i| values[i])
        .collect()
}

/// Replace abnormal values with the mean of their valid neighbors
///
/// A flagged position whose neighbor pool is empty is counted but keeps
/// its value.
pub fn correct(values: &[f64], config: &CorrectorConfig) -> CorrectedSeries {
    let sentinels = sentinel_mask(values);
    let mut corrected = values.to_vec();
    let mut abnormal_count = 0;

    for index in 0..values.len() {
        if !classify(values, &sentinels, index, config) {
            continue;
        }
        abnormal_count += 1;

        let pool = replacement_pool(values, &sentinels, index, config.half_window);
        if !pool.is_empty() {
            corrected[index] = mean(&pool);
        }
    }

    CorrectedSeries {
        values: corrected,
        abnormal_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn flat(len: usize, value: f64) -> Vec<f64> {
        vec![value; len]
    }

    #[test]
    fn test_edges_never_flagged() {
        let mut values = flat(40, 10.0);
        values[0] = 0.0;
        values[11] = 500.0;
        values[28] = 0.0;
        values[39] = -500.0;

        let config = CorrectorConfig::default();
        for index in (0..12).chain(28..40) {
            assert!(!is_abnormal(&values, index, &config), "index {index}");
        }
    }

    #[test]
    fn test_zero_flagged_with_full_context() {
        let mut values = flat(25, 3.0);
        values[12] = 0.0;

        assert!(is_abnormal(&values, 12, &CorrectorConfig::default()));
    }

    #[test]
    fn test_spike_flagged_and_replaced() {
        let mut values: Vec<f64> = (0..40).map(|i| 10.0 + (i % 3) as f64 * 0.1).collect();
        values[20] = 80.0;

        let corrected = correct(&values, &CorrectorConfig::default());

        assert_eq!(corrected.abnormal_count, 1);
        let expected = mean(
            &values[8..20]
                .iter()
                .chain(&values[21..33])
                .copied()
                .collect::<Vec<_>>(),
        );
        assert!((corrected.values[20] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_corrections_do_not_cascade() {
        // Two adjacent zeros: the second must still see the first as 0.0
        let mut values = flat(40, 10.0);
        values[20] = 0.0;
        values[21] = 0.0;

        let corrected = correct(&values, &CorrectorConfig::default());

        assert_eq!(corrected.abnormal_count, 2);
        // Pool for 21 holds 11 tens, the raw zero at 20, then 12 tens
        let expected = (23.0 * 10.0) / 24.0;
        assert!((corrected.values[21] - expected).abs() < 1e-9);
        assert!((corrected.values[20] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sentinel_shaped_value_skipped() {
        let mut values = flat(40, 10.0);
        values[20] = 9999.0;

        assert!(!is_abnormal(&values, 20, &CorrectorConfig::default()));
    }

    #[test]
    fn test_insufficient_context_not_flagged() {
        let mut values = flat(40, 99999.0);
        values[20] = 5.0;
        for v in values.iter_mut().skip(14).take(6) {
            *v = 5.0;
        }

        // Only 7 non-sentinel values in the window around 20
        assert!(!is_abnormal(&values, 20, &CorrectorConfig::default()));
    }

    #[test]
    fn test_empty_pool_counted_but_uncorrected() {
        let mut values = flat(30, 10.0);
        values[15] = 0.0;
        let config = CorrectorConfig {
            half_window: 12,
            min_context: 12,
            threshold: 2.0,
        };
        // Surround the zero with sentinels so no replacement value exists
        for (i, v) in values.iter_mut().enumerate() {
            if i != 15 && (3..=27).contains(&i) {
                *v = 9999.0;
            }
        }

        let corrected = correct(&values, &config);

        assert_eq!(corrected.abnormal_count, 1);
        assert_eq!(corrected.values[15], 0.0);
    }

    #[test]
    fn test_threshold_controls_sensitivity() {
        let mut values: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 9.0 } else { 11.0 }).collect();
        values[20] = 13.5;

        assert!(is_abnormal(&values, 20, &CorrectorConfig::default()));
        assert!(!is_abnormal(&values, 20, &CorrectorConfig::with_threshold(3.0)));
    }

    #[test]
    fn test_pool_skips_masked_neighbors() {
        let values = [1.0, 9999.0, 5.0, 3.0, -9999999.0, 7.0];
        let sentinels = sentinel_mask(&values);

        assert_eq!(sentinels, vec![false, true, false, false, true, false]);
        assert_eq!(replacement_pool(&values, &sentinels, 3, 2), vec![5.0, 7.0]);
        assert_eq!(replacement_pool(&values, &sentinels, 0, 12), vec![5.0, 3.0, 7.0]);
    }

    #[test]
    fn test_single_position_matches_full_pass() {
        let mut values: Vec<f64> = (0..60).map(|i| 20.0 + (i % 5) as f64).collect();
        values[18] = 9999.0;
        values[25] = 0.0;
        values[40] = 95.0;

        let config = CorrectorConfig::default();
        let flagged = (0..values.len())
            .filter(|&i| is_abnormal(&values, i, &config))
            .count();

        assert_eq!(flagged, 2);
        assert_eq!(correct(&values, &config).abnormal_count, flagged);
    }

    #[test]
    fn test_out_of_bounds_index() {
        assert!(!is_abnormal(&[1.0, 2.0], 5, &CorrectorConfig::default()));
    }

    proptest! {
        #[test]
        fn prop_short_series_never_flagged(values in prop::collection::vec(-1000.0f64..1000.0, 0..25)) {
            let corrected = correct(&values, &CorrectorConfig::default());
            prop_assert_eq!(corrected.abnormal_count, 0);
            prop_assert_eq!(corrected.values, values);
        }

        #[test]
        fn prop_length_and_count_bounds(values in prop::collection::vec(-1000.0f64..1000.0, 0..120)) {
            let corrected = correct(&values, &CorrectorConfig::default());
            prop_assert_eq!(corrected.values.len(), values.len());
            prop_assert!(corrected.abnormal_count <= values.len());
        }

        #[test]
        fn prop_edges_untouched(values in prop::collection::vec(-1000.0f64..1000.0, 25..80)) {
            let corrected = correct(&values, &CorrectorConfig::default());
            let len = values.len();
            for index in (0..12).chain(len - 12..len) {
                prop_assert_eq!(corrected.values[index], values[index]);
            }
        }
    }
}
