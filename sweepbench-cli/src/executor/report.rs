//! Report Building
//!
//! Assembles the final `Report` from the sweep outcome, the aggregated
//! statistics and the analysis output, and fills in the summary.
//!
//! ```text
//! SweepOutcome ──► compute_statistics ──► analyze
//!                                            │
//!                                            ▼
//!                                  Report (+ ReportSummary)
//! ```

use super::analysis::AnalysisOutput;
use super::execution::SweepOutcome;
use super::metadata::build_report_meta;
use std::collections::BTreeSet;
use sweepbench_core::{Configuration, Operation, TrialFailure};
use sweepbench_report::{ConfigurationResult, MissingCell, Report, ReportConfig, ReportSummary};

/// Build a complete Report
pub fn build_report(
    outcome: SweepOutcome,
    results: Vec<ConfigurationResult>,
    analysis: AnalysisOutput,
    config: ReportConfig,
) -> Report {
    let missing_cells = missing_cells(&outcome, &results, &config);
    let summary = summarize(
        &outcome,
        &results,
        &analysis,
        missing_cells.len(),
        config.subjects.len(),
        &config.operations,
    );

    Report {
        meta: build_report_meta(config),
        results,
        overheads: analysis.overheads,
        crossovers: analysis.crossovers,
        best_of: analysis.best_of,
        failures: outcome.failures,
        missing_cells,
        analysis_errors: analysis.issues,
        summary,
    }
}

/// Every cell of the full sweep that has no statistic, with its cause
///
/// Configurations skipped by an abort or a cancellation count too.
fn missing_cells(
    outcome: &SweepOutcome,
    results: &[ConfigurationResult],
    config: &ReportConfig,
) -> Vec<MissingCell> {
    let ran: BTreeSet<Configuration> = results.iter().map(|r| r.configuration).collect();
    let mut axis: BTreeSet<Configuration> =
        config.sweep.configurations().unwrap_or_default().into_iter().collect();
    axis.extend(ran.iter().copied());

    let not_run = if outcome.cancelled {
        "not run (cancelled)"
    } else if outcome.aborted {
        "not run (aborted)"
    } else {
        "not run"
    };

    let mut missing = Vec::new();
    for &configuration in &axis {
        let result = results.iter().find(|r| r.configuration == configuration);
        for subject in &config.subjects {
            for operation in &config.operations {
                if result.is_some_and(|r| r.cell(subject, operation.as_str()).is_some()) {
                    continue;
                }
                let cause = if ran.contains(&configuration) {
                    failure_causes(&outcome.failures, configuration, subject, operation)
                } else {
                    not_run.to_string()
                };
                missing.push(MissingCell {
                    configuration,
                    subject: subject.clone(),
                    operation: operation.clone(),
                    cause,
                });
            }
        }
    }
    missing
}

fn failure_causes(
    failures: &[TrialFailure],
    configuration: Configuration,
    subject: &str,
    operation: &Operation,
) -> String {
    let mut causes: Vec<String> = Vec::new();
    for f in failures.iter().filter(|f| {
        f.configuration == configuration && f.subject == subject && f.operation == *operation
    }) {
        let cause = f.cause.to_string();
        if !causes.contains(&cause) {
            causes.push(cause);
        }
    }
    if causes.is_empty() {
        "no samples".to_string()
    } else {
        causes.join("; ")
    }
}

fn summarize(
    outcome: &SweepOutcome,
    results: &[ConfigurationResult],
    analysis: &AnalysisOutput,
    missing_cells: usize,
    subjects: usize,
    operations: &[Operation],
) -> ReportSummary {
    let cells: usize = results
        .iter()
        .map(|r| r.subjects.values().map(|ops| ops.len()).sum::<usize>())
        .sum();

    ReportSummary {
        configurations: results.len(),
        subjects,
        operations: operations.len(),
        cells,
        missing_cells,
        failed_trials: outcome.failures.len(),
        analysis_errors: analysis.issues.len(),
        aborted: outcome.aborted,
        cancelled: outcome.cancelled,
        total_duration_ms: outcome.duration.as_secs_f64() * 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepbench_core::{Configuration, SweepSpec};
    use sweepbench_report::CellStatistic;

    #[test]
    fn test_summary_counts_missing_cells() {
        let mut r1 = ConfigurationResult::new(Configuration(1));
        r1.insert("base", Operation::total(), CellStatistic::from_samples(&[1.0], 0).unwrap());
        r1.insert("variant", Operation::total(), CellStatistic::from_samples(&[2.0], 0).unwrap());
        let mut r2 = ConfigurationResult::new(Configuration(2));
        r2.insert("base", Operation::total(), CellStatistic::from_samples(&[1.0], 0).unwrap());

        let config = ReportConfig {
            sweep: SweepSpec::linear(1, 2, 1),
            repetitions: 1,
            drop: 0,
            operations: vec![Operation::total()],
            subjects: vec!["base".into(), "variant".into()],
            baseline: Some("base".into()),
            jobs: 1,
            timeout_ms: 1000,
            failure_policy: "skip".into(),
            store: "per-trial".into(),
        };
        let report = build_report(
            SweepOutcome::default(),
            vec![r1, r2],
            AnalysisOutput::default(),
            config,
        );
        assert_eq!(report.summary.configurations, 2);
        assert_eq!(report.summary.cells, 3);
        assert_eq!(report.summary.missing_cells, 1);
        assert_eq!(report.missing_cells[0].subject, "variant");
        assert_eq!(report.missing_cells[0].cause, "no samples");
        assert_eq!(report.meta.schema_version, sweepbench_report::REPORT_SCHEMA_VERSION);
    }

    fn config(from: i64, to: i64) -> ReportConfig {
        ReportConfig {
            sweep: SweepSpec::linear(from, to, 1),
            repetitions: 4,
            drop: 0,
            operations: vec![Operation::total()],
            subjects: vec!["base".into()],
            baseline: Some("base".into()),
            jobs: 1,
            timeout_ms: 1000,
            failure_policy: "abort".into(),
            store: "per-trial".into(),
        }
    }

    fn failure(config: i64, message: &str) -> TrialFailure {
        TrialFailure {
            subject: "base".into(),
            configuration: Configuration(config),
            operation: Operation::total(),
            cause: sweepbench_core::FailureCause::Workload {
                message: message.into(),
            },
        }
    }

    #[test]
    fn test_partially_failed_cell_is_not_missing() {
        let mut r1 = ConfigurationResult::new(Configuration(1));
        r1.insert("base", Operation::total(), CellStatistic::from_samples(&[1.0, 1.1, 0.9], 0).unwrap());
        let outcome = SweepOutcome {
            completed: vec![Configuration(1)],
            failures: vec![failure(1, "flaky")],
            ..SweepOutcome::default()
        };
        let report = build_report(outcome, vec![r1], AnalysisOutput::default(), config(1, 1));
        assert_eq!(report.summary.failed_trials, 1);
        assert_eq!(report.summary.missing_cells, 0);
        assert!(report.missing_cells.is_empty());
    }

    #[test]
    fn test_aborted_configurations_are_missing() {
        let r1 = ConfigurationResult::new(Configuration(1));
        let outcome = SweepOutcome {
            completed: vec![Configuration(1)],
            failures: vec![failure(1, "disk full"), failure(1, "disk full")],
            aborted: true,
            ..SweepOutcome::default()
        };
        let report = build_report(outcome, vec![r1], AnalysisOutput::default(), config(1, 3));

        assert_eq!(report.summary.missing_cells, 3);
        let causes: Vec<&str> = report.missing_cells.iter().map(|m| m.cause.as_str()).collect();
        assert_eq!(
            causes,
            vec!["workload error: disk full", "not run (aborted)", "not run (aborted)"]
        );
    }
}
