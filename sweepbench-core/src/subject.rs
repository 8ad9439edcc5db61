//! The Subject abstraction
//!
//! A subject is anything that can run one configuration and report how
//! long each operation took: an external program, an in-process function,
//! or a test double.

use crate::{Configuration, FailureCause, Operation, OperationTimings};
use std::path::Path;

/// Everything a subject needs to run one trial
#[derive(Debug, Clone, Copy)]
pub struct TrialRequest<'a> {
    /// Configuration to run
    pub configuration: Configuration,
    /// Operations the harness wants timings for
    pub operations: &'a [Operation],
    /// Scratch directory owned by this trial
    pub scratch: &'a Path,
    /// Zero-based repetition index within the configuration
    pub repetition: usize,
}

/// A system under test
pub trait Subject: Send + Sync {
    /// Stable label used in reports (`base`, `variant`, ...)
    fn label(&self) -> &str;

    /// Run one trial
    ///
    /// Returning `Err` marks the whole invocation as failed. Operations
    /// missing from a successful result fail individually.
    fn run_trial(&self, request: &TrialRequest<'_>) -> Result<OperationTimings, FailureCause>;
}

impl<S: Subject + ?Sized> Subject for Box<S> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn run_trial(&self, request: &TrialRequest<'_>) -> Result<OperationTimings, FailureCause> {
        (**self).run_trial(request)
    }
}

impl<S: Subject + ?Sized> Subject for std::sync::Arc<S> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn run_trial(&self, request: &TrialRequest<'_>) -> Result<OperationTimings, FailureCause> {
        (**self).run_trial(request)
    }
}
