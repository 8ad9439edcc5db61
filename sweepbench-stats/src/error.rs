//! Error types for aggregation and analysis

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reducing samples
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// Aggregation was asked to reduce nothing
    #[error("cannot aggregate an empty sample set")]
    EmptySamples,
}

/// Errors raised while comparing statistic series
///
/// Alignment errors are fatal to one comparison; a degenerate baseline is
/// fatal to one overhead record only.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnalysisError {
    /// The two series do not have the same number of configurations
    #[error("series length mismatch: baseline has {baseline} points, comparison has {comparison}")]
    LengthMismatch {
        /// Points in the baseline series
        baseline: usize,
        /// Points in the comparison series
        comparison: usize,
    },

    /// The two series disagree on the configuration at some index
    #[error("series misaligned at index {index}: {baseline} vs {comparison}")]
    Misaligned {
        /// First index where the keys differ
        index: usize,
        /// Baseline configuration at that index
        baseline: String,
        /// Comparison configuration at that index
        comparison: String,
    },

    /// Baseline value is zero, negative or not finite
    #[error("degenerate baseline value {value} at index {index}")]
    DegenerateBaseline {
        /// Index of the offending record
        index: usize,
        /// The baseline value
        value: f64,
    },

    /// A series with no points was passed where at least one is required
    #[error("cannot analyze an empty series")]
    EmptySeries,

    /// One side of a comparison has no statistic at this configuration
    #[error("no value for '{subject}' at configuration {configuration}")]
    MissingValue {
        /// Configuration of the hole
        configuration: String,
        /// Subject whose cell is missing
        subject: String,
    },
}

impl AnalysisError {
    /// Whether this error means the series did not share a configuration axis
    pub fn is_alignment(&self) -> bool {
        matches!(
            self,
            AnalysisError::LengthMismatch { .. } | AnalysisError::Misaligned { .. }
        )
    }
}
