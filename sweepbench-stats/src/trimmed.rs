//! Trimmed Mean Aggregation
//!
//! Process-invocation timings are dominated by occasional outliers
//! (scheduling jitter, cold caches). The aggregation policy sorts the
//! samples, drops `drop` values from each tail and averages the rest.
//!
//! When `2 * drop >= len` there is nothing left to average, so the plain
//! mean over all samples is returned instead. An empty input is an error.

use crate::error::StatsError;
use serde::{Deserialize, Serialize};

/// Result of reducing one sample set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedValue {
    /// The aggregated statistic (trimmed mean, or plain mean on fallback)
    pub value: f64,
    /// Number of raw samples that went into the reduction
    pub sample_count: usize,
    /// Number of samples actually averaged after trimming
    pub retained: usize,
    /// False when the trim degraded to the plain mean
    pub trimmed: bool,
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

/// Compute the symmetric trimmed mean of `samples`
///
/// # Examples
///
/// ```
/// # use sweepbench_stats::trimmed_mean;
/// let agg = trimmed_mean(&[1.0, 2.0, 3.0, 100.0], 1).unwrap();
/// assert!((agg.value - 2.5).abs() < 1e-12);
/// assert_eq!(agg.retained, 2);
/// ```
pub fn trimmed_mean(samples: &[f64], drop: usize) -> Result<AggregatedValue, StatsError> {
    let plain = mean(samples).ok_or(StatsError::EmptySamples)?;
    let n = samples.len();

    // Degenerate trim: fall back to the unclipped mean
    if drop == 0 || drop.saturating_mul(2) >= n {
        return Ok(AggregatedValue {
            value: plain,
            sample_count: n,
            retained: n,
            trimmed: drop == 0,
        });
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let kept = &sorted[drop..n - drop];

    Ok(AggregatedValue {
        value: kept.iter().sum::<f64>() / kept.len() as f64,
        sample_count: n,
        retained: kept.len(),
        trimmed: true,
    })
}

/// Shorthand for [`trimmed_mean`] returning only the statistic
pub fn aggregate(samples: &[f64], drop: usize) -> Result<f64, StatsError> {
    trimmed_mean(samples, drop).map(|agg| agg.value)
}
