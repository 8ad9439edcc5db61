//! Summary Statistics
//!
//! Descriptive statistics reported alongside the trimmed mean. Unlike the
//! aggregated value, everything here is computed over ALL samples of a
//! cell so that the spread the trim hides stays visible in reports.

use crate::percentiles::{Percentiles, compute_percentiles};
use serde::{Deserialize, Serialize};

/// Descriptive statistics over an untrimmed sample set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Plain arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Percentiles (median is `percentiles.p50`)
    pub percentiles: Percentiles,
    /// Number of samples
    pub sample_count: usize,
}

/// Compute summary statistics over all samples
///
/// An empty slice yields an all-zero summary with `sample_count == 0`.
pub fn compute_summary(samples: &[f64]) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics {
            mean: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            percentiles: compute_percentiles(samples),
            sample_count: 0,
        };
    }

    let n = samples.len();
    let mean = samples.iter().sum::<f64>() / n as f64;

    let std_dev = if n < 2 {
        0.0
    } else {
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };

    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    SummaryStatistics {
        mean,
        std_dev,
        min,
        max,
        percentiles: compute_percentiles(samples),
        sample_count: n,
    }
}

impl SummaryStatistics {
    /// Median of the samples
    pub fn median(&self) -> f64 {
        self.percentiles.p50
    }

    /// Coefficient of variation (relative stddev, percent)
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }

    /// Check if the cell looks stable (CV below threshold)
    pub fn is_stable(&self, cv_threshold: f64) -> bool {
        self.coefficient_of_variation() < cv_threshold
    }
}
