#![warn(missing_docs)]
//! # SweepBench
//!
//! Comparative overhead benchmarking across parameter sweeps.
//!
//! SweepBench runs several implementations of the same workload (the
//! *subjects*) across a swept parameter such as a row count, and reports
//! how much slower each one is than a baseline:
//! - **Sweeps**: linear or powers-of-ten configuration sequences
//! - **Subjects**: external programs (timed from their own output or by
//!   wall clock) or in-process closures
//! - **Robust aggregation**: symmetric trimmed mean per cell
//! - **Overhead analysis**: per-configuration and total overhead, an opt-in
//!   non-improvement clamp, crossover points and best-of curves
//! - **Fail-late execution**: failed trials are recorded, never fatal
//! - **Exchange format**: versioned JSON plus per-operation plot series
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sweepbench::prelude::*;
//!
//! let mut config = SweepConfig::default();
//! config.sweep = SweepSpec::exponential(1, 5, 1);
//! config.runner.repetitions = 5;
//! config.runner.drop = 1;
//!
//! let subjects: Vec<Arc<dyn Subject>> = vec![
//!     Arc::new(FnSubject::new("vec", |scope| {
//!         let n = scope.size() as usize;
//!         scope.measure("total", || (0..n).collect::<Vec<_>>());
//!         Ok(())
//!     })),
//!     Arc::new(FnSubject::new("list", |scope| {
//!         let n = scope.size() as usize;
//!         scope.measure("total", || (0..n).collect::<std::collections::LinkedList<_>>());
//!         Ok(())
//!     })),
//! ];
//!
//! let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();
//! println!("{}", format_human_output(&report));
//! ```
//!
//! ## Command Line
//!
//! External subjects are described in a `sweep.toml` and run with the
//! `sweepbench` binary; see `sweepbench init` for an annotated template.

// Re-export core types
pub use sweepbench_core::{
    CancellationToken, Configuration, FailureCause, FnSubject, Operation, OperationTimings,
    OutputFormat, OutputParser, Subject, SweepError, SweepSpec, Timer, TrialFailure,
    TrialRequest, TrialSample, TrialScope, TrialScratch,
};

// Re-export stats
pub use sweepbench_stats::{
    AggregatedValue, AnalysisError, OverheadPolicy, SeriesPoint, SummaryStatistics, aggregate,
    best_of, compute_overhead, compute_summary, find_crossover, total_overhead, trimmed_mean,
};

// Re-export reporting
pub use sweepbench_report::{
    Report, generate_csv_report, generate_json_report, generate_series_json, write_report_files,
};

// Re-export the runner
pub use sweepbench_cli::{
    FailurePolicy, ProcessSubject, RunStatus, StoreMode, SweepConfig, format_human_output,
    process_subjects, run, run_sweep,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CancellationToken, Configuration, FnSubject, Operation, Report, Subject, SweepConfig,
        SweepSpec, TrialScope, format_human_output, run_sweep,
    };
}
