//! Sweep Executor
//!
//! Runs the sweep and turns raw samples into a report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! SweepSpec ──► [Configuration]
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Run trials, apply failure policy, collect samples
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ statistics  │  Trimmed mean + descriptive stats per cell (parallel)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  analysis   │  Overhead, clamp, crossovers, best-of
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Assemble Report + summary
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```

mod analysis;
mod execution;
mod formatting;
mod metadata;
mod report;
mod statistics;

pub use analysis::{AnalysisOutput, AnalysisPlan, analyze, series_of};
pub use execution::{ExecutionConfig, SampleSet, SweepOutcome, SweepRunner};
pub use formatting::format_human_output;
pub use report::build_report;
pub use statistics::compute_statistics;
