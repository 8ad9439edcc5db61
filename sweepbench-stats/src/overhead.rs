//! Relative Overhead
//!
//! Compares a comparison series against a baseline series that share the
//! same configuration axis:
//!
//! ```text
//! overhead% = (comparison - baseline) / baseline * 100
//! ```
//!
//! The non-improvement clamp is opt-in per comparison. When enabled the
//! comparison value is raised to `max(comparison, baseline)` first, so
//! measurement noise cannot produce a negative overhead for a variant that
//! can never be faster than the baseline.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One point of a statistic series: configuration key and value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint<K> {
    /// Configuration this value belongs to
    pub key: K,
    /// Aggregated statistic (seconds)
    pub value: f64,
}

impl<K> SeriesPoint<K> {
    /// Create a point
    pub fn new(key: K, value: f64) -> Self {
        Self { key, value }
    }
}

/// Policy applied to one baseline/comparison pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverheadPolicy {
    /// Clamp the comparison to `max(comparison, baseline)` before computing
    pub clamp_non_improvement: bool,
}

impl OverheadPolicy {
    /// Policy with the non-improvement clamp enabled
    pub fn clamped() -> Self {
        Self {
            clamp_non_improvement: true,
        }
    }
}

/// Overhead of one comparison value over its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverheadRecord<K> {
    /// Configuration
    pub key: K,
    /// Baseline statistic
    pub baseline: f64,
    /// Comparison statistic after the policy was applied
    pub comparison: f64,
    /// Comparison statistic as measured
    pub raw_comparison: f64,
    /// Relative overhead in percent
    pub overhead_pct: f64,
}

/// Per-record outcome: a degenerate baseline only invalidates its own record
pub type RecordOutcome<K> = Result<OverheadRecord<K>, AnalysisError>;

/// Relative overhead in percent, `None` when the baseline is not a positive
/// finite number
pub fn overhead_percent(baseline: f64, comparison: f64, policy: OverheadPolicy) -> Option<f64> {
    if !baseline.is_finite() || baseline <= 0.0 {
        return None;
    }
    let comparison = if policy.clamp_non_improvement {
        comparison.max(baseline)
    } else {
        comparison
    };
    Some((comparison - baseline) / baseline * 100.0)
}

/// Verify that two series share an identical configuration axis
pub fn check_alignment<K: PartialEq + Debug>(
    baseline: &[SeriesPoint<K>],
    comparison: &[SeriesPoint<K>],
) -> Result<(), AnalysisError> {
    if baseline.len() != comparison.len() {
        return Err(AnalysisError::LengthMismatch {
            baseline: baseline.len(),
            comparison: comparison.len(),
        });
    }

    match baseline
        .iter()
        .zip(comparison)
        .position(|(b, c)| b.key != c.key)
    {
        Some(index) => Err(AnalysisError::Misaligned {
            index,
            baseline: format!("{:?}", baseline[index].key),
            comparison: format!("{:?}", comparison[index].key),
        }),
        None => Ok(()),
    }
}

/// Compute the overhead series of `comparison` relative to `baseline`
///
/// The outer `Result` fails when the series are misaligned; each inner
/// outcome fails independently on a degenerate baseline.
///
/// # Examples
///
/// ```
/// # use sweepbench_stats::{OverheadPolicy, SeriesPoint, compute_overhead};
/// let base = [SeriesPoint::new(1, 1.0), SeriesPoint::new(2, 2.0)];
/// let cmp = [SeriesPoint::new(1, 1.5), SeriesPoint::new(2, 1.8)];
/// let records = compute_overhead(&base, &cmp, OverheadPolicy::default()).unwrap();
/// let pct: Vec<f64> = records.iter().map(|r| r.as_ref().unwrap().overhead_pct).collect();
/// assert!((pct[0] - 50.0).abs() < 1e-9);
/// assert!((pct[1] + 10.0).abs() < 1e-9);
/// ```
pub fn compute_overhead<K: PartialEq + Clone + Debug>(
    baseline: &[SeriesPoint<K>],
    comparison: &[SeriesPoint<K>],
    policy: OverheadPolicy,
) -> Result<Vec<RecordOutcome<K>>, AnalysisError> {
    check_alignment(baseline, comparison)?;

    Ok(baseline
        .iter()
        .zip(comparison)
        .enumerate()
        .map(|(index, (b, c))| {
            let overhead_pct = overhead_percent(b.value, c.value, policy).ok_or(
                AnalysisError::DegenerateBaseline {
                    index,
                    value: b.value,
                },
            )?;
            let comparison = if policy.clamp_non_improvement {
                c.value.max(b.value)
            } else {
                c.value
            };
            Ok(OverheadRecord {
                key: b.key.clone(),
                baseline: b.value,
                comparison,
                raw_comparison: c.value,
                overhead_pct,
            })
        })
        .collect())
}

/// Overhead of the summed comparison over the summed baseline
///
/// This is the single "whole sweep" figure: total time spent by the variant
/// across every configuration relative to the baseline's total.
pub fn total_overhead(
    baseline: &[f64],
    comparison: &[f64],
    policy: OverheadPolicy,
) -> Result<f64, AnalysisError> {
    if baseline.len() != comparison.len() {
        return Err(AnalysisError::LengthMismatch {
            baseline: baseline.len(),
            comparison: comparison.len(),
        });
    }
    if baseline.is_empty() {
        return Err(AnalysisError::EmptySeries);
    }

    let base_total: f64 = baseline.iter().sum();
    let cmp_total: f64 = if policy.clamp_non_improvement {
        baseline.iter().zip(comparison).map(|(b, c)| c.max(*b)).sum()
    } else {
        comparison.iter().sum()
    };

    overhead_percent(base_total, cmp_total, OverheadPolicy::default()).ok_or(
        AnalysisError::DegenerateBaseline {
            index: 0,
            value: base_total,
        },
    )
}
