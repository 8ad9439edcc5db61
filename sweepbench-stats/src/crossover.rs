//! Crossover Detection and Best-Of Series
//!
//! Given the overhead series of two competing strategies on the same
//! configuration axis, the crossover is the first configuration (in
//! increasing order) at which strategy A's overhead is less than or equal
//! to strategy B's. If A never catches up, the crossover is defined as the
//! last configuration of the sweep.
//!
//! The best-of series is the pointwise minimum overhead across strategies:
//! what an oracle that always picks the cheaper strategy would pay.

use crate::error::AnalysisError;
use crate::overhead::{SeriesPoint, check_alignment};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Crossover between two strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crossover<K> {
    /// Zero-based index into the configuration axis
    pub index: usize,
    /// Configuration at `index`
    pub key: K,
    /// False when no crossing was observed and `index` is the last configuration
    pub found: bool,
}

/// One point of a best-of series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestOfPoint<K> {
    /// Configuration
    pub key: K,
    /// Minimum overhead across strategies
    pub value: f64,
    /// Index (into the input strategies) of the cheapest one; first wins ties
    pub winner: usize,
}

/// Index-only crossover over two raw overhead slices
///
/// Returns `(index, found)`.
pub fn crossover_index(a: &[f64], b: &[f64]) -> Result<(usize, bool), AnalysisError> {
    if a.len() != b.len() {
        return Err(AnalysisError::LengthMismatch {
            baseline: a.len(),
            comparison: b.len(),
        });
    }
    if a.is_empty() {
        return Err(AnalysisError::EmptySeries);
    }

    Ok(match a.iter().zip(b).position(|(x, y)| x <= y) {
        Some(index) => (index, true),
        None => (a.len() - 1, false),
    })
}

/// Find the crossover of strategy `a` under strategy `b`
///
/// # Examples
///
/// ```
/// # use sweepbench_stats::{SeriesPoint, find_crossover};
/// let a: Vec<_> = [80.0, 60.0, 40.0, 10.0].iter().enumerate()
///     .map(|(i, &v)| SeriesPoint::new(i + 1, v)).collect();
/// let b: Vec<_> = [10.0, 30.0, 50.0, 70.0].iter().enumerate()
///     .map(|(i, &v)| SeriesPoint::new(i + 1, v)).collect();
/// let cross = find_crossover(&a, &b).unwrap();
/// assert_eq!(cross.index, 2);
/// assert_eq!(cross.key, 3);
/// ```
pub fn find_crossover<K: PartialEq + Clone + Debug>(
    a: &[SeriesPoint<K>],
    b: &[SeriesPoint<K>],
) -> Result<Crossover<K>, AnalysisError> {
    check_alignment(a, b)?;
    let av: Vec<f64> = a.iter().map(|p| p.value).collect();
    let bv: Vec<f64> = b.iter().map(|p| p.value).collect();
    let (index, found) = crossover_index(&av, &bv)?;

    Ok(Crossover {
        index,
        key: a[index].key.clone(),
        found,
    })
}

/// Pointwise minimum across two or more aligned strategy series
pub fn best_of<K: PartialEq + Clone + Debug>(
    strategies: &[&[SeriesPoint<K>]],
) -> Result<Vec<BestOfPoint<K>>, AnalysisError> {
    let first = strategies.first().ok_or(AnalysisError::EmptySeries)?;
    for other in &strategies[1..] {
        check_alignment(first, other)?;
    }

    Ok((0..first.len())
        .map(|i| {
            let mut winner = 0;
            let mut value = first[i].value;
            for (s, series) in strategies.iter().enumerate().skip(1) {
                if series[i].value < value {
                    value = series[i].value;
                    winner = s;
                }
            }
            BestOfPoint {
                key: first[i].key.clone(),
                value,
                winner,
            }
        })
        .collect())
}
