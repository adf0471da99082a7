//! Window Statistics

/// Population statistics for a neighborhood window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation (divides by N)
    pub std_dev: f64,
    /// Number of values the statistics cover
    pub count: usize,
}

impl WindowStats {
    /// Compute mean and population standard deviation of a slice
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let m2: f64 = values
            .iter()
            .map(|&v| {
                let d = v - mean;
                d * d
            })
            .sum();

        Self {
            mean,
            std_dev: (m2 / n).sqrt(),
            count: values.len(),
        }
    }

    /// Whether `value` lies more than `threshold` standard deviations from the mean
    ///
    /// A zero standard deviation flags any non-zero deviation.
    pub fn deviates(&self, value: f64, threshold: f64) -> bool {
        (value - self.mean).abs() > threshold * self.std_dev
    }
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    WindowStats::compute(values).mean
}
