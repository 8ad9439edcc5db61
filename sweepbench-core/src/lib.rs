#![warn(missing_docs)]
//! SweepBench Core - Experiment Model
//!
//! This crate defines what a sweep is made of and how one trial is run:
//! - `Configuration` / `Operation` identities and the sweep generator
//! - The `Subject` trait: "run one configuration, return elapsed times"
//! - `FnSubject` for in-process entry points, timed with a monotonic clock
//! - Output parsers for subjects that report their own timings
//! - Disposable per-trial scratch stores and cooperative cancellation
//!
//! Process-spawning subjects live in `sweepbench-cli`, next to the
//! supervisor that enforces their timeouts.

mod cancel;
mod in_process;
mod measure;
mod parse;
mod scratch;
mod subject;
mod sweep;
mod trial;

pub use cancel::CancellationToken;
pub use in_process::{FnSubject, TrialScope};
pub use measure::Timer;
pub use parse::{DEFAULT_TOTAL_PATTERN, OutputFormat, OutputParser};
pub use scratch::{SCRATCH_DIR_ENV, TrialScratch};
pub use subject::{Subject, TrialRequest};
pub use sweep::{SweepError, SweepSpec};
pub use trial::{
    FailureCause, OperationTimings, TrialFailure, TrialSample, split_outcome,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// One point in the swept parameter space (tuple count, context count, ...)
///
/// Identity and ordering are the parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(pub i64);

impl Configuration {
    /// The parameter value
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for Configuration {
    fn from(value: i64) -> Self {
        Configuration(value)
    }
}

/// A named unit of measured work (`insert`, `select`, `total`, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operation(String);

impl Operation {
    /// Name of the aggregate operation covering a whole trial
    pub const TOTAL: &'static str = "total";

    /// Create an operation from its name
    pub fn new(name: impl Into<String>) -> Self {
        Operation(name.into())
    }

    /// The aggregate `total` operation
    pub fn total() -> Self {
        Operation::new(Self::TOTAL)
    }

    /// Operation name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the aggregate `total` operation
    pub fn is_total(&self) -> bool {
        self.0 == Self::TOTAL
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Operation {
    fn from(name: &str) -> Self {
        Operation::new(name)
    }
}

impl From<String> for Operation {
    fn from(name: String) -> Self {
        Operation(name)
    }
}

impl std::borrow::Borrow<str> for Operation {
    fn borrow(&self) -> &str {
        &self.0
    }
}
