//! Percentile Computation
//!
//! Percentiles are computed from the raw (untrimmed) samples of a cell.
//! Trial counts are small, so linear interpolation between ranks is used
//! rather than nearest-rank selection.

use serde::{Deserialize, Serialize};

/// Quartiles and upper tail of one sample set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    /// 25th percentile
    pub p25: f64,
    /// 50th percentile (median)
    pub p50: f64,
    /// 75th percentile
    pub p75: f64,
    /// 90th percentile
    pub p90: f64,
}

impl Percentiles {
    /// Interquartile range
    pub fn iqr(&self) -> f64 {
        self.p75 - self.p25
    }
}

/// Compute a single percentile from samples
///
/// Uses linear interpolation between nearest ranks. Returns 0.0 for an
/// empty slice.
///
/// # Examples
///
/// ```
/// # use sweepbench_stats::compute_percentile;
/// let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// assert!((compute_percentile(&samples, 50.0) - 3.0).abs() < 1e-12);
/// ```
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    if samples.len() == 1 {
        return samples[0];
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let p = (percentile / 100.0).clamp(0.0, 1.0);

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx])
}

/// Compute the standard percentile set
pub fn compute_percentiles(samples: &[f64]) -> Percentiles {
    Percentiles {
        p25: compute_percentile(samples, 25.0),
        p50: compute_percentile(samples, 50.0),
        p75: compute_percentile(samples, 75.0),
        p90: compute_percentile(samples, 90.0),
    }
}
