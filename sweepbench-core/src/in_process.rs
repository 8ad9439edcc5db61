//! In-Process Subjects
//!
//! `FnSubject` wraps a closure that performs the work for one
//! configuration. The closure times exactly the unit of work with
//! `TrialScope::measure`, so setup and teardown stay out of the numbers.
//! Panics are caught and reported as failures of the trial.

use crate::measure::Timer;
use crate::{
    Configuration, FailureCause, Operation, OperationTimings, Subject, TrialRequest,
};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

/// Recorder handed to an in-process subject for one trial
#[derive(Debug)]
pub struct TrialScope<'a> {
    request: &'a TrialRequest<'a>,
    timings: OperationTimings,
}

impl<'a> TrialScope<'a> {
    fn new(request: &'a TrialRequest<'a>) -> Self {
        Self {
            request,
            timings: OperationTimings::new(),
        }
    }

    /// Configuration being run
    pub fn configuration(&self) -> Configuration {
        self.request.configuration
    }

    /// Configuration value, e.g. the number of tuples to work on
    pub fn size(&self) -> i64 {
        self.request.configuration.value()
    }

    /// Zero-based repetition index
    pub fn repetition(&self) -> usize {
        self.request.repetition
    }

    /// Scratch directory owned by this trial
    pub fn scratch_dir(&self) -> &Path {
        self.request.scratch
    }

    /// Whether the harness asked for `operation`
    pub fn wants(&self, operation: &str) -> bool {
        self.request.operations.iter().any(|op| op.as_str() == operation)
    }

    /// Time `f` and add its elapsed time to `operation`
    ///
    /// Measuring the same operation twice in one trial sums the two.
    pub fn measure<R>(&mut self, operation: impl Into<Operation>, f: impl FnOnce() -> R) -> R {
        let (result, secs) = Timer::time(f);
        self.record(operation, secs);
        result
    }

    /// Add an externally measured elapsed time to `operation`
    pub fn record(&mut self, operation: impl Into<Operation>, secs: f64) {
        *self.timings.entry(operation.into()).or_insert(0.0) += secs;
    }

    fn finish(mut self) -> OperationTimings {
        let total = Operation::total();
        if !self.timings.contains_key(&total) && !self.timings.is_empty() {
            let sum = self.timings.values().sum();
            self.timings.insert(total, sum);
        }
        self.timings
    }
}

/// Subject backed by an in-process function
///
/// # Examples
///
/// ```
/// # use sweepbench_core::FnSubject;
/// let subject = FnSubject::new("vec", |scope| {
///     let n = scope.size() as usize;
///     let v: Vec<u64> = scope.measure("insert", || (0..n as u64).collect());
///     scope.measure("select", || v.iter().sum::<u64>());
///     Ok(())
/// });
/// ```
pub struct FnSubject<F> {
    label: String,
    run: F,
}

impl<F> FnSubject<F>
where
    F: Fn(&mut TrialScope<'_>) -> Result<(), String> + Send + Sync,
{
    /// Wrap `run` under `label`
    pub fn new(label: impl Into<String>, run: F) -> Self {
        Self {
            label: label.into(),
            run,
        }
    }
}

impl<F> std::fmt::Debug for FnSubject<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSubject").field("label", &self.label).finish()
    }
}

impl<F> Subject for FnSubject<F>
where
    F: Fn(&mut TrialScope<'_>) -> Result<(), String> + Send + Sync,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn run_trial(&self, request: &TrialRequest<'_>) -> Result<OperationTimings, FailureCause> {
        let mut scope = TrialScope::new(request);
        let outcome = catch_unwind(AssertUnwindSafe(|| (self.run)(&mut scope)));

        match outcome {
            Ok(Ok(())) => Ok(scope.finish()),
            Ok(Err(message)) => Err(FailureCause::Workload { message }),
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                Err(FailureCause::Panicked { message })
            }
        }
    }
}
