#![warn(missing_docs)]
//! SweepBench Statistical Engine
//!
//! Pure reductions over already-collected timing samples:
//! - Symmetric trimmed mean (the aggregation policy for noisy process timings)
//! - Descriptive statistics over the untrimmed sample set
//! - Percentile calculation
//! - Relative overhead between a baseline and a comparison series
//! - Crossover detection and best-of series across competing strategies
//!
//! Nothing in this crate performs I/O or locking. Series are keyed by a
//! generic configuration type so the analyzer can be tested without the
//! rest of the harness.

mod crossover;
mod error;
mod overhead;
mod percentiles;
mod summary;
mod trimmed;

pub use crossover::{BestOfPoint, Crossover, best_of, crossover_index, find_crossover};
pub use error::{AnalysisError, StatsError};
pub use overhead::{
    OverheadPolicy, OverheadRecord, RecordOutcome, SeriesPoint, check_alignment, compute_overhead,
    overhead_percent, total_overhead,
};
pub use percentiles::{Percentiles, compute_percentile, compute_percentiles};
pub use summary::{SummaryStatistics, compute_summary};
pub use trimmed::{AggregatedValue, aggregate, mean, trimmed_mean};

/// Default number of samples dropped from each tail
pub const DEFAULT_DROP: usize = 0;

/// Coefficient of variation (percent) above which a cell is reported as noisy
pub const DEFAULT_NOISE_THRESHOLD_PCT: f64 = 10.0;
