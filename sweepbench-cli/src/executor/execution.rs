//! Sweep Execution
//!
//! Drives every subject through every configuration and collects the raw
//! samples. Configurations run strictly in order; within one
//! configuration the trials are independent and may run on a bounded
//! worker pool.
//!
//! ## Data Flow
//!
//! ```text
//! [Configuration] (from SweepSpec)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │   SweepRunner    │  subjects × repetitions per configuration
//! └────────┬─────────┘
//!          │  split_outcome + failure policy
//!          ▼
//!  SweepOutcome (SampleSet, TrialFailures, abort/cancel flags)
//! ```

use crate::config::{FailurePolicy, StoreMode, SweepConfig};
use fxhash::FxHashMap;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sweepbench_core::{
    CancellationToken, Configuration, FailureCause, Operation, OperationTimings, Subject,
    TrialFailure, TrialRequest, TrialSample, TrialScratch, split_outcome,
};
use tracing::{debug, info, warn};

/// Configuration for sweep execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Trials per (subject, configuration)
    pub repetitions: usize,
    /// Concurrent trials
    pub jobs: usize,
    /// Operations collected from every subject
    pub operations: Vec<Operation>,
    /// Failure handling
    pub failure_policy: FailurePolicy,
    /// Scratch store sharing
    pub store: StoreMode,
    /// Sum missing `total` timings from the other operations
    pub derive_total: bool,
    /// Directory for scratch stores; the system temp directory when unset
    pub scratch_root: Option<PathBuf>,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            repetitions: 10,
            jobs: 1,
            operations: vec![Operation::total()],
            failure_policy: FailurePolicy::Skip,
            store: StoreMode::PerTrial,
            derive_total: false,
            scratch_root: None,
            show_progress: false,
        }
    }
}

impl From<&SweepConfig> for ExecutionConfig {
    fn from(config: &SweepConfig) -> Self {
        Self {
            repetitions: config.runner.repetitions,
            jobs: config.runner.jobs.max(1),
            operations: config.runner.operations.clone(),
            failure_policy: config.runner.failure_policy,
            store: config.runner.store,
            derive_total: config.runner.derive_total,
            scratch_root: config.runner.scratch_root.clone(),
            show_progress: false,
        }
    }
}

type CellKey = (Configuration, String, Operation);

/// Raw samples grouped by (configuration, subject, operation)
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    cells: FxHashMap<CellKey, Vec<f64>>,
}

impl SampleSet {
    /// Add one sample to its cell
    pub fn push(&mut self, sample: TrialSample) {
        self.cells
            .entry((sample.configuration, sample.subject, sample.operation))
            .or_default()
            .push(sample.elapsed_secs);
    }

    /// Samples of one cell
    pub fn get(&self, configuration: Configuration, subject: &str, operation: &str) -> Option<&[f64]> {
        self.cells
            .get(&(configuration, subject.to_string(), Operation::from(operation)))
            .map(Vec::as_slice)
    }

    /// All cells
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &Vec<f64>)> {
        self.cells.iter()
    }

    /// Number of non-empty cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no sample was collected
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total number of samples
    pub fn sample_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

/// Everything a sweep produced before aggregation
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Configurations whose trials all ran, in order
    pub completed: Vec<Configuration>,
    /// Collected samples
    pub samples: SampleSet,
    /// Trials that failed after retries
    pub failures: Vec<TrialFailure>,
    /// Stopped by the abort policy
    pub aborted: bool,
    /// Stopped by cancellation
    pub cancelled: bool,
    /// Wall time of the whole sweep
    pub duration: Duration,
}

/// One unit of scheduled work inside a configuration
#[derive(Debug, Clone, Copy)]
enum Task {
    /// A single trial with its own scratch store
    Trial { subject: usize, repetition: usize },
    /// All repetitions of one subject, sharing one scratch store
    Series { subject: usize },
}

/// Runs a set of subjects across a sweep
pub struct SweepRunner {
    config: ExecutionConfig,
    subjects: Vec<Arc<dyn Subject>>,
    cancel: CancellationToken,
}

impl SweepRunner {
    /// Create a runner
    pub fn new(config: ExecutionConfig, subjects: Vec<Arc<dyn Subject>>) -> Self {
        Self {
            config,
            subjects,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to stop the sweep between configurations
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Labels of the subjects, in run order
    pub fn labels(&self) -> Vec<String> {
        self.subjects.iter().map(|s| s.label().to_string()).collect()
    }

    fn progress_bar(&self, trials: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(trials);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Execute the sweep
    ///
    /// Cancellation and the abort policy both stop the sweep at a
    /// configuration boundary; samples of completed configurations are kept.
    pub fn run(&self, configurations: &[Configuration]) -> anyhow::Result<SweepOutcome> {
        let start = Instant::now();
        let mut outcome = SweepOutcome::default();

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.jobs.max(1))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build worker pool: {}", e))?;

        let trials = (configurations.len() * self.subjects.len() * self.config.repetitions) as u64;
        let pb = self.progress_bar(trials);

        info!(
            configurations = configurations.len(),
            subjects = self.subjects.len(),
            repetitions = self.config.repetitions,
            jobs = self.config.jobs,
            "starting sweep"
        );

        for &configuration in configurations {
            if self.cancel.is_cancelled() {
                warn!(%configuration, "sweep cancelled before configuration");
                outcome.cancelled = true;
                break;
            }

            pb.set_message(format!("configuration {configuration}"));
            let tasks = self.tasks();
            let results: Vec<(Vec<TrialSample>, Vec<TrialFailure>)> = if self.config.jobs <= 1 {
                tasks
                    .iter()
                    .map(|task| self.run_task(*task, configuration, &pb))
                    .collect()
            } else {
                pool.install(|| {
                    tasks
                        .par_iter()
                        .map(|task| self.run_task(*task, configuration, &pb))
                        .collect()
                })
            };

            let mut failed = 0;
            for (samples, failures) in results {
                for sample in samples {
                    outcome.samples.push(sample);
                }
                failed += failures.len();
                outcome.failures.extend(failures);
            }
            outcome.completed.push(configuration);

            if failed > 0 {
                warn!(%configuration, failed, "configuration has failed cells");
                if self.config.failure_policy == FailurePolicy::Abort {
                    outcome.aborted = true;
                    break;
                }
            } else {
                debug!(%configuration, "configuration complete");
            }
        }

        pb.finish_with_message("Complete");
        outcome.duration = start.elapsed();
        info!(
            completed = outcome.completed.len(),
            samples = outcome.samples.sample_count(),
            failures = outcome.failures.len(),
            "sweep finished in {:.2}s",
            outcome.duration.as_secs_f64()
        );
        Ok(outcome)
    }

    fn tasks(&self) -> Vec<Task> {
        match self.config.store {
            StoreMode::PerTrial => (0..self.subjects.len())
                .flat_map(|subject| {
                    (0..self.config.repetitions).map(move |repetition| Task::Trial {
                        subject,
                        repetition,
                    })
                })
                .collect(),
            StoreMode::PerConfiguration => (0..self.subjects.len())
                .map(|subject| Task::Series { subject })
                .collect(),
        }
    }

    fn run_task(
        &self,
        task: Task,
        configuration: Configuration,
        pb: &ProgressBar,
    ) -> (Vec<TrialSample>, Vec<TrialFailure>) {
        match task {
            Task::Trial {
                subject,
                repetition,
            } => {
                let result =
                    self.run_with_policy(&*self.subjects[subject], configuration, repetition, None);
                pb.inc(1);
                result
            }
            Task::Series { subject } => {
                let subject = &*self.subjects[subject];
                let scratch = match self.scratch(subject.label()) {
                    Ok(scratch) => scratch,
                    Err(e) => {
                        let cause = scratch_failure(&e);
                        let mut failures = Vec::new();
                        for _ in 0..self.config.repetitions {
                            failures.extend(
                                split_outcome(
                                    subject.label(),
                                    configuration,
                                    &self.config.operations,
                                    Err(cause.clone()),
                                )
                                .1,
                            );
                            pb.inc(1);
                        }
                        return (Vec::new(), failures);
                    }
                };

                let mut samples = Vec::new();
                let mut failures = Vec::new();
                for repetition in 0..self.config.repetitions {
                    let (s, f) = self.run_with_policy(
                        subject,
                        configuration,
                        repetition,
                        Some(scratch.path()),
                    );
                    samples.extend(s);
                    failures.extend(f);
                    pb.inc(1);
                }
                (samples, failures)
            }
        }
    }

    /// One trial, re-run per the retry policy
    fn run_with_policy(
        &self,
        subject: &dyn Subject,
        configuration: Configuration,
        repetition: usize,
        shared_scratch: Option<&Path>,
    ) -> (Vec<TrialSample>, Vec<TrialFailure>) {
        let attempts = 1 + self.config.failure_policy.retries();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.attempt(subject, configuration, repetition, shared_scratch);
            let (samples, failures) = split_outcome(
                subject.label(),
                configuration,
                &self.config.operations,
                result,
            );

            if failures.is_empty() || attempt >= attempts {
                for failure in &failures {
                    warn!(
                        subject = %failure.subject,
                        configuration = %failure.configuration,
                        operation = %failure.operation,
                        "trial failed: {}",
                        failure.cause
                    );
                }
                return (samples, failures);
            }
            debug!(
                subject = subject.label(),
                %configuration,
                repetition,
                attempt,
                "retrying failed trial"
            );
        }
    }

    fn scratch(&self, label: &str) -> std::io::Result<TrialScratch> {
        match &self.config.scratch_root {
            Some(root) => TrialScratch::create_in(root, label),
            None => TrialScratch::create(label),
        }
    }

    fn attempt(
        &self,
        subject: &dyn Subject,
        configuration: Configuration,
        repetition: usize,
        shared_scratch: Option<&Path>,
    ) -> Result<OperationTimings, FailureCause> {
        // A per-trial store lives exactly as long as this attempt.
        let owned;
        let scratch = match shared_scratch {
            Some(path) => path,
            None => {
                owned = self.scratch(subject.label()).map_err(|e| scratch_failure(&e))?;
                owned.path()
            }
        };

        let request = TrialRequest {
            configuration,
            operations: &self.config.operations,
            scratch,
            repetition,
        };
        let mut timings = subject.run_trial(&request)?;
        if self.config.derive_total {
            derive_total(&mut timings);
        }
        Ok(timings)
    }
}

fn scratch_failure(e: &std::io::Error) -> FailureCause {
    FailureCause::Spawn {
        message: format!("could not create scratch store: {e}"),
    }
}

/// Insert `total` as the sum of every other timing when it is absent
fn derive_total(timings: &mut OperationTimings) {
    let total = Operation::total();
    if !timings.contains_key(&total) && !timings.is_empty() {
        let sum = timings.values().sum();
        timings.insert(total, sum);
    }
}
