//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sweepbench_core::{Configuration, Operation, SweepSpec, TrialFailure};
use sweepbench_stats::{
    AggregatedValue, AnalysisError, SeriesPoint, StatsError, compute_summary, trimmed_mean,
};

/// Complete sweep report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    /// Sorted ascending by configuration
    pub results: Vec<ConfigurationResult>,
    pub overheads: Vec<OverheadSeries>,
    pub crossovers: Vec<CrossoverResult>,
    pub best_of: Vec<BestOfSeries>,
    /// Every failed trial, including ones whose cell still has samples
    pub failures: Vec<TrialFailure>,
    /// Cells of the sweep with no statistic
    #[serde(default)]
    pub missing_cells: Vec<MissingCell>,
    pub analysis_errors: Vec<AnalysisIssue>,
    pub summary: ReportSummary,
}

/// A (configuration, subject, operation) cell without a statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCell {
    pub configuration: Configuration,
    pub subject: String,
    pub operation: Operation,
    /// Trial failure messages, or why the configuration never ran
    pub cause: String,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema: String,
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub git_commit: Option<String>,
    pub git_branch: Option<String>,
    pub system: SystemInfo,
    pub config: ReportConfig,
}

/// Sweep settings captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub sweep: SweepSpec,
    pub repetitions: usize,
    pub drop: usize,
    pub operations: Vec<Operation>,
    pub subjects: Vec<String>,
    pub baseline: Option<String>,
    pub jobs: usize,
    pub timeout_ms: u64,
    pub failure_policy: String,
    pub store: String,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
}

/// All statistics measured at one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationResult {
    pub configuration: Configuration,
    /// subject → operation → statistic
    pub subjects: BTreeMap<String, BTreeMap<Operation, CellStatistic>>,
}

impl ConfigurationResult {
    /// Empty result for `configuration`
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            subjects: BTreeMap::new(),
        }
    }

    /// Statistic for one (subject, operation) cell
    pub fn cell(&self, subject: &str, operation: &str) -> Option<&CellStatistic> {
        self.subjects.get(subject)?.get(operation)
    }

    /// Store the statistic for one cell
    pub fn insert(&mut self, subject: &str, operation: Operation, cell: CellStatistic) {
        self.subjects
            .entry(subject.to_string())
            .or_default()
            .insert(operation, cell);
    }
}

/// Statistic of one (configuration, subject, operation) cell
///
/// `value` is the trimmed mean used for every comparison. The descriptive
/// fields are computed over the full, untrimmed sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellStatistic {
    /// Trimmed mean in seconds
    pub value: f64,
    /// Samples collected
    pub samples: usize,
    /// Samples that contributed to `value`
    pub retained: usize,
    /// Whether trimming was applied (false on fallback to the plain mean)
    pub trimmed: bool,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl CellStatistic {
    /// Aggregate raw samples with `drop` values trimmed from each end
    pub fn from_samples(samples: &[f64], drop: usize) -> Result<Self, StatsError> {
        let AggregatedValue {
            value,
            sample_count,
            retained,
            trimmed,
        } = trimmed_mean(samples, drop)?;
        let summary = compute_summary(samples);
        Ok(Self {
            value,
            samples: sample_count,
            retained,
            trimmed,
            mean: summary.mean,
            std_dev: summary.std_dev,
            min: summary.min,
            max: summary.max,
            median: summary.median(),
        })
    }
}

/// Overhead of one subject over the baseline for one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverheadSeries {
    pub subject: String,
    pub baseline: String,
    pub operation: Operation,
    /// Whether the non-improvement clamp was applied
    pub clamped: bool,
    pub points: Vec<OverheadPoint>,
    /// Overhead of the summed comparison over the summed baseline
    pub total_overhead_pct: Option<f64>,
}

impl OverheadSeries {
    /// Overhead values as a series keyed by configuration, skipping
    /// degenerate records
    pub fn series(&self) -> Vec<SeriesPoint<Configuration>> {
        self.points
            .iter()
            .filter_map(|p| {
                p.overhead_pct
                    .map(|pct| SeriesPoint::new(p.configuration, pct))
            })
            .collect()
    }
}

/// One overhead record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverheadPoint {
    pub configuration: Configuration,
    /// `None` when the baseline cell is missing
    pub baseline: Option<f64>,
    /// Comparison value after the clamp (if any)
    pub comparison: Option<f64>,
    pub raw_comparison: Option<f64>,
    /// `None` when either cell is missing or the baseline was degenerate
    pub overhead_pct: Option<f64>,
    pub error: Option<AnalysisError>,
}

/// Where strategy `a` stops being more expensive than strategy `b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverResult {
    pub a: String,
    pub b: String,
    pub operation: Operation,
    pub index: usize,
    pub configuration: Configuration,
    /// False when no crossing was observed; `configuration` is then the last one
    pub found: bool,
}

/// Pointwise cheapest strategy across several subjects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestOfSeries {
    pub operation: Operation,
    pub candidates: Vec<String>,
    pub points: Vec<BestOfEntry>,
}

/// One point of a best-of series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestOfEntry {
    pub configuration: Configuration,
    pub overhead_pct: f64,
    pub winner: String,
}

/// An analysis step that could not be completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisIssue {
    /// Which comparison failed, e.g. `variant vs base (total)`
    pub context: String,
    pub error: AnalysisError,
}

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub configurations: usize,
    pub subjects: usize,
    pub operations: usize,
    pub cells: usize,
    pub missing_cells: usize,
    pub failed_trials: usize,
    pub analysis_errors: usize,
    pub aborted: bool,
    pub cancelled: bool,
    pub total_duration_ms: f64,
}

impl Report {
    /// Configuration axis of the report
    pub fn configurations(&self) -> Vec<Configuration> {
        self.results.iter().map(|r| r.configuration).collect()
    }

    /// Statistic values of one (subject, operation) across the sweep
    ///
    /// Configurations without a value for that cell are left out.
    pub fn series(&self, subject: &str, operation: &str) -> Vec<SeriesPoint<Configuration>> {
        self.results
            .iter()
            .filter_map(|r| {
                r.cell(subject, operation)
                    .map(|c| SeriesPoint::new(r.configuration, c.value))
            })
            .collect()
    }

    /// Overhead series for one subject and operation
    pub fn overhead(&self, subject: &str, operation: &str) -> Option<&OverheadSeries> {
        self.overheads
            .iter()
            .find(|o| o.subject == subject && o.operation.as_str() == operation)
    }

    /// Every operation that appears in the results, sorted
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops: Vec<Operation> = self
            .results
            .iter()
            .flat_map(|r| r.subjects.values())
            .flat_map(|cells| cells.keys().cloned())
            .collect();
        ops.sort();
        ops.dedup();
        ops
    }

    /// Every subject that appears in the results, sorted
    pub fn subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self
            .results
            .iter()
            .flat_map(|r| r.subjects.keys().cloned())
            .collect();
        subjects.sort();
        subjects.dedup();
        subjects
    }
}
