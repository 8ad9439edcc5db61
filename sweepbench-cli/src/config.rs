//! Configuration loading from sweep.toml
//!
//! A sweep is described by a `sweep.toml` file, discovered by walking up
//! from the current directory. Every section has defaults so a file only
//! needs `[sweep]` bounds and at least one `[[subjects]]` entry.

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use sweepbench_core::{Operation, OutputFormat, SweepSpec};

/// File name looked up by `discover`
pub const CONFIG_FILE: &str = "sweep.toml";

/// SweepBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SweepConfig {
    /// Sweep bounds
    #[serde(default)]
    pub sweep: SweepSpec,
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Subjects under test
    #[serde(default)]
    pub subjects: Vec<SubjectConfig>,
    /// Comparison configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to do with a failed trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure, keep going (default)
    #[default]
    Skip,
    /// Re-run the trial up to `n` more times before recording the failure
    Retry(u32),
    /// Stop after the current configuration
    Abort,
}

impl FailurePolicy {
    /// Extra attempts allowed after the first failure
    pub fn retries(self) -> u32 {
        match self {
            FailurePolicy::Retry(n) => n,
            _ => 0,
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Skip => write!(f, "skip"),
            FailurePolicy::Retry(n) => write!(f, "retry({n})"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// How scratch stores are shared between trials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreMode {
    /// A fresh store for every trial (default)
    #[default]
    PerTrial,
    /// One store per (subject, configuration); its repetitions run serially
    PerConfiguration,
}

impl std::fmt::Display for StoreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreMode::PerTrial => write!(f, "per-trial"),
            StoreMode::PerConfiguration => write!(f, "per-configuration"),
        }
    }
}

/// Runner configuration for sweep execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Trials per (subject, configuration)
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    /// Samples trimmed from each end before averaging
    #[serde(default)]
    pub drop: usize,
    /// Timeout for a single trial (e.g., "60s", "5m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Number of concurrent trials
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Operations to collect from every subject
    #[serde(default = "default_operations")]
    pub operations: Vec<Operation>,
    /// Failure handling
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Scratch store sharing
    #[serde(default)]
    pub store: StoreMode,
    /// Add a `total` timing as the sum of the others when a subject lacks one
    #[serde(default)]
    pub derive_total: bool,
    /// Directory for scratch stores (default: the system temp directory)
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            repetitions: default_repetitions(),
            drop: 0,
            timeout: default_timeout(),
            jobs: default_jobs(),
            operations: default_operations(),
            failure_policy: FailurePolicy::default(),
            store: StoreMode::default(),
            derive_total: false,
            scratch_root: None,
        }
    }
}

fn default_repetitions() -> usize {
    10
}
fn default_timeout() -> String {
    "60s".to_string()
}
fn default_jobs() -> usize {
    1
}
fn default_operations() -> Vec<Operation> {
    vec![Operation::total()]
}

/// One external program under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConfig {
    /// Label used in reports
    pub label: String,
    /// Program to execute
    pub program: PathBuf,
    /// Arguments; `{config}` and `{scratch}` are substituted per trial
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Per-subject timeout, overriding `runner.timeout`
    #[serde(default)]
    pub timeout: Option<String>,
    /// How the program reports its timings
    #[serde(default)]
    pub output: OutputFormat,
}

/// A crossover to locate between two subjects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverConfig {
    /// Strategy expected to start out more expensive
    pub a: String,
    /// Strategy it is compared against
    pub b: String,
    /// Operation whose overhead is compared
    #[serde(default = "default_operation")]
    pub operation: Operation,
}

fn default_operation() -> Operation {
    Operation::total()
}

/// Comparison configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisConfig {
    /// Baseline subject; defaults to the first subject
    #[serde(default)]
    pub baseline: Option<String>,
    /// Subjects whose overhead gets the non-improvement clamp
    #[serde(default)]
    pub clamp: Vec<String>,
    /// Crossovers to locate
    #[serde(default)]
    pub crossovers: Vec<CrossoverConfig>,
    /// Competing subjects folded into a best-of series
    #[serde(default)]
    pub best_of: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Terminal output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
    /// Output directory for report files
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Also write report.csv
    #[serde(default)]
    pub csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
            csv: false,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    "target/sweepbench".to_string()
}

impl SweepConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Find `sweep.toml` by walking up from the current directory
    pub fn discover() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Label of the baseline subject
    pub fn baseline(&self) -> Option<&str> {
        self.analysis
            .baseline
            .as_deref()
            .or_else(|| self.subjects.first().map(|s| s.label.as_str()))
    }

    /// Timeout of the runner in nanoseconds
    pub fn timeout_ns(&self) -> anyhow::Result<u64> {
        Self::parse_duration(&self.runner.timeout)
    }

    /// Check cross-references and bounds before anything runs
    pub fn validate(&self) -> anyhow::Result<()> {
        for subject in &self.subjects {
            if let Some(timeout) = &subject.timeout {
                Self::parse_duration(timeout)
                    .with_context(|| format!("timeout of subject '{}'", subject.label))?;
            }
        }
        let labels: Vec<&str> = self.subjects.iter().map(|s| s.label.as_str()).collect();
        self.validate_for(&labels)
    }

    /// Validate against an explicit set of subject labels
    ///
    /// Used when subjects are supplied in-process rather than as
    /// `[[subjects]]` entries.
    pub fn validate_for(&self, subject_labels: &[&str]) -> anyhow::Result<()> {
        self.sweep.validate()?;

        if self.runner.repetitions == 0 {
            bail!("runner.repetitions must be at least 1");
        }
        if self.runner.jobs == 0 {
            bail!("runner.jobs must be at least 1");
        }
        if self.runner.operations.is_empty() {
            bail!("runner.operations must name at least one operation");
        }
        self.timeout_ns()?;

        let mut labels = BTreeSet::new();
        for &label in subject_labels {
            if label.is_empty() {
                bail!("subject label must not be empty");
            }
            if !labels.insert(label) {
                bail!("duplicate subject label '{}'", label);
            }
        }

        let known = |label: &str, what: &str| -> anyhow::Result<()> {
            if labels.contains(label) {
                Ok(())
            } else {
                bail!("{what} refers to unknown subject '{label}'")
            }
        };

        if let Some(baseline) = &self.analysis.baseline {
            known(baseline, "analysis.baseline")?;
        }
        for label in &self.analysis.clamp {
            known(label, "analysis.clamp")?;
        }
        for crossover in &self.analysis.crossovers {
            known(&crossover.a, "analysis.crossovers")?;
            known(&crossover.b, "analysis.crossovers")?;
        }
        for label in &self.analysis.best_of {
            known(label, "analysis.best_of")?;
        }
        if self.analysis.best_of.len() == 1 {
            bail!("analysis.best_of needs at least two subjects");
        }
        Ok(())
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# SweepBench Configuration

[sweep]
# First and last configuration value (inclusive)
from = 1
to = 5
step = 1
# Use 10^value instead of value
exponential = true

[runner]
# Trials per subject and configuration
repetitions = 10
# Samples discarded from each end before averaging
drop = 1
# Timeout for a single trial
timeout = "60s"
# Concurrent trials
jobs = 1
# Operations reported by every subject
operations = ["total"]
# "skip", "abort" or { retry = 2 }
failure_policy = "skip"
# "per-trial" or "per-configuration"
store = "per-trial"
# Sum the other operations into "total" when a subject does not report it
derive_total = false
# Where scratch stores are created (default: system temp directory)
# scratch_root = "/mnt/fast-disk/sweepbench"

[[subjects]]
label = "base"
program = "./bench"
args = ["{config}", "{scratch}/db"]
output = { kind = "total" }

[[subjects]]
label = "variant"
program = "./bench"
args = ["{config}", "{scratch}/db"]
env = { LD_PRELOAD = "./libvariant.so" }
output = { kind = "total" }

[analysis]
# Subject every other subject is compared against
baseline = "base"
# Subjects whose overhead is clamped at zero
clamp = []
# best_of = ["variant", "other"]

# [[analysis.crossovers]]
# a = "variant"
# b = "other"
# operation = "total"

[output]
# Terminal output format: human, json, csv
format = "human"
# Output directory for reports
directory = "target/sweepbench"
# Also write report.csv
csv = false
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }
}
