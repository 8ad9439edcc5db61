//! Trial Outcomes
//!
//! A trial runs one subject at one configuration and yields a timing per
//! requested operation. Whatever goes wrong is captured as a
//! `TrialFailure` for the affected operations instead of an early return,
//! so one bad trial never takes the sweep down with it.

use crate::{Configuration, Operation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Elapsed seconds per operation reported by one trial
pub type OperationTimings = BTreeMap<Operation, f64>;

/// One measured elapsed time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSample {
    /// Configuration the trial ran at
    pub configuration: Configuration,
    /// Subject label
    pub subject: String,
    /// Measured operation
    pub operation: Operation,
    /// Elapsed seconds (finite, non-negative)
    pub elapsed_secs: f64,
}

/// Why a trial produced no timing for an operation
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FailureCause {
    /// The subject could not be started
    #[error("failed to start subject: {message}")]
    Spawn {
        /// Underlying error
        message: String,
    },
    /// The subject exited unsuccessfully
    #[error("subject exited with {}: {stderr}", exit_status(.code))]
    NonZeroExit {
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Tail of the subject's stderr
        stderr: String,
    },
    /// Output did not contain a usable timing
    #[error("unparseable output: {message}")]
    Unparseable {
        /// What the parser expected
        message: String,
    },
    /// Output was parsed but this operation was absent
    #[error("output has no timing for this operation")]
    MissingOperation,
    /// The subject exceeded its time limit and was terminated
    #[error("timed out after {timeout_ms} ms")]
    Timeout {
        /// Limit that was exceeded
        timeout_ms: u64,
    },
    /// An in-process subject panicked
    #[error("panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string
        message: String,
    },
    /// An in-process subject reported an error
    #[error("workload error: {message}")]
    Workload {
        /// Error reported by the subject
        message: String,
    },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

/// A missing (subject, configuration, operation) cell and its cause
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("subject '{subject}' at configuration {configuration}, operation '{operation}': {cause}")]
pub struct TrialFailure {
    /// Subject label
    pub subject: String,
    /// Configuration the trial ran at
    pub configuration: Configuration,
    /// Operation that has no timing
    pub operation: Operation,
    /// What went wrong
    pub cause: FailureCause,
}

/// Turn the result of one trial into samples and failures
///
/// Every requested operation ends up in exactly one of the two lists:
/// - whole-invocation failure: one failure per requested operation
/// - operation absent from the timings: `MissingOperation`
/// - negative or non-finite timing: `Unparseable`
///
/// Timings for operations nobody asked for are ignored.
pub fn split_outcome(
    subject: &str,
    configuration: Configuration,
    operations: &[Operation],
    result: Result<OperationTimings, FailureCause>,
) -> (Vec<TrialSample>, Vec<TrialFailure>) {
    let failure = |operation: &Operation, cause: FailureCause| TrialFailure {
        subject: subject.to_string(),
        configuration,
        operation: operation.clone(),
        cause,
    };

    let timings = match result {
        Ok(timings) => timings,
        Err(cause) => {
            let failures = operations
                .iter()
                .map(|op| failure(op, cause.clone()))
                .collect();
            return (Vec::new(), failures);
        }
    };

    let mut samples = Vec::with_capacity(operations.len());
    let mut failures = Vec::new();
    for op in operations {
        match timings.get(op) {
            Some(&secs) if secs.is_finite() && secs >= 0.0 => samples.push(TrialSample {
                configuration,
                subject: subject.to_string(),
                operation: op.clone(),
                elapsed_secs: secs,
            }),
            Some(&secs) => failures.push(failure(
                op,
                FailureCause::Unparseable {
                    message: format!("invalid elapsed time {secs}"),
                },
            )),
            None => failures.push(failure(op, FailureCause::MissingOperation)),
        }
    }
    (samples, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(names: &[&str]) -> Vec<Operation> {
        names.iter().map(|n| Operation::from(*n)).collect()
    }

    #[test]
    fn test_whole_invocation_failure_covers_every_operation() {
        let operations = ops(&["insert", "select", "update", "delete"]);
        let (samples, failures) = split_outcome(
            "variant",
            Configuration(1000),
            &operations,
            Err(FailureCause::Timeout { timeout_ms: 500 }),
        );
        assert!(samples.is_empty());
        assert_eq!(failures.len(), 4);
        assert!(failures.iter().all(|f| f.cause == FailureCause::Timeout { timeout_ms: 500 }));
        assert_eq!(failures[1].operation.as_str(), "select");
    }

    #[test]
    fn test_missing_operation_fails_alone() {
        let operations = ops(&["insert", "select"]);
        let mut timings = OperationTimings::new();
        timings.insert("insert".into(), 0.25);
        timings.insert("extra".into(), 9.0);

        let (samples, failures) =
            split_outcome("base", Configuration(10), &operations, Ok(timings));
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].operation.as_str(), "insert");
        assert!((samples[0].elapsed_secs - 0.25).abs() < 1e-12);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].operation.as_str(), "select");
        assert_eq!(failures[0].cause, FailureCause::MissingOperation);
    }

    #[test]
    fn test_invalid_timings_rejected() {
        let operations = ops(&["a", "b"]);
        let mut timings = OperationTimings::new();
        timings.insert("a".into(), -1.0);
        timings.insert("b".into(), f64::NAN);

        let (samples, failures) = split_outcome("s", Configuration(1), &operations, Ok(timings));
        assert!(samples.is_empty());
        assert!(
            failures
                .iter()
                .all(|f| matches!(f.cause, FailureCause::Unparseable { .. }))
        );
    }

    #[test]
    fn test_failure_display() {
        let failure = TrialFailure {
            subject: "variant".into(),
            configuration: Configuration(100),
            operation: "total".into(),
            cause: FailureCause::NonZeroExit {
                code: Some(3),
                stderr: "boom".into(),
            },
        };
        let text = failure.to_string();
        assert!(text.contains("variant"));
        assert!(text.contains("100"));
        assert!(text.contains("exit code 3"));
    }

    #[test]
    fn test_cause_serializes_tagged() {
        let json = serde_json::to_value(FailureCause::Timeout { timeout_ms: 10 }).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["timeout_ms"], 10);
    }
}
