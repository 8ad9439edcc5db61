//! Overhead Analysis
//!
//! Turns aggregated statistics into comparisons against the baseline:
//! - per-configuration overhead of every other subject, per operation
//! - the total overhead across the sweep
//! - crossover points between pairs of strategies
//! - best-of series across competing strategies
//!
//! A failed comparison is recorded as an `AnalysisIssue` and never stops
//! the other comparisons.

use crate::config::{CrossoverConfig, SweepConfig};
use std::collections::BTreeSet;
use sweepbench_core::{Configuration, Operation};
use sweepbench_report::{
    AnalysisIssue, BestOfEntry, BestOfSeries, ConfigurationResult, CrossoverResult, OverheadPoint,
    OverheadSeries,
};
use sweepbench_stats::{
    AnalysisError, OverheadPolicy, SeriesPoint, best_of, compute_overhead, find_crossover,
    total_overhead,
};
use tracing::warn;

/// What to compare
#[derive(Debug, Clone, Default)]
pub struct AnalysisPlan {
    /// Baseline subject
    pub baseline: Option<String>,
    /// All subjects, in run order
    pub subjects: Vec<String>,
    /// Operations to compare
    pub operations: Vec<Operation>,
    /// Subjects with the non-improvement clamp
    pub clamp: BTreeSet<String>,
    /// Crossovers to locate
    pub crossovers: Vec<CrossoverConfig>,
    /// Competing subjects for the best-of series
    pub best_of: Vec<String>,
}

impl AnalysisPlan {
    /// Plan from configuration and the labels of the subjects that ran
    pub fn from_config(config: &SweepConfig, subjects: &[String]) -> Self {
        Self {
            baseline: config
                .analysis
                .baseline
                .clone()
                .or_else(|| subjects.first().cloned()),
            subjects: subjects.to_vec(),
            operations: config.runner.operations.clone(),
            clamp: config.analysis.clamp.iter().cloned().collect(),
            crossovers: config.analysis.crossovers.clone(),
            best_of: config.analysis.best_of.clone(),
        }
    }
}

/// Everything derived from the statistics
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutput {
    /// One overhead series per non-baseline subject and operation
    pub overheads: Vec<OverheadSeries>,
    /// Located crossovers, in plan order
    pub crossovers: Vec<CrossoverResult>,
    /// Best-of series, one per operation
    pub best_of: Vec<BestOfSeries>,
    /// Comparisons that could not be completed
    pub issues: Vec<AnalysisIssue>,
}

impl AnalysisOutput {
    fn issue(&mut self, context: String, error: AnalysisError) {
        warn!(context = %context, "analysis failed: {}", error);
        self.issues.push(AnalysisIssue { context, error });
    }

    /// Overhead values of `subject` keyed by configuration
    ///
    /// The baseline compares against itself, so its overhead is zero
    /// wherever it has a value.
    fn overhead_series(
        &self,
        results: &[ConfigurationResult],
        baseline: &str,
        subject: &str,
        operation: &Operation,
    ) -> Option<Vec<SeriesPoint<Configuration>>> {
        if subject == baseline {
            return Some(
                series_of(results, baseline, operation.as_str())
                    .into_iter()
                    .map(|p| SeriesPoint::new(p.key, 0.0))
                    .collect(),
            );
        }
        self.overheads
            .iter()
            .find(|o| o.subject == subject && o.operation == *operation)
            .map(OverheadSeries::series)
    }
}

/// Statistic values of one cell across the sweep, skipping missing cells
pub fn series_of(
    results: &[ConfigurationResult],
    subject: &str,
    operation: &str,
) -> Vec<SeriesPoint<Configuration>> {
    results
        .iter()
        .filter_map(|r| {
            r.cell(subject, operation)
                .map(|c| SeriesPoint::new(r.configuration, c.value))
        })
        .collect()
}

/// Keep only the configurations present in every series
///
/// Inputs are sorted by configuration, so the result shares one axis.
fn common_points(
    series: &[Vec<SeriesPoint<Configuration>>],
) -> Vec<Vec<SeriesPoint<Configuration>>> {
    let shared = |key: &Configuration| series.iter().all(|s| s.iter().any(|p| p.key == *key));
    series
        .iter()
        .map(|s| s.iter().filter(|p| shared(&p.key)).cloned().collect())
        .collect()
}

/// Overhead of `subject` against `baseline` over every configuration
///
/// Configurations where either side lacks a value get a point with a
/// `MissingValue` error; the rest are compared pairwise.
fn overhead_points(
    results: &[ConfigurationResult],
    baseline: &str,
    subject: &str,
    operation: &Operation,
    policy: OverheadPolicy,
) -> Result<(Vec<OverheadPoint>, Vec<f64>, Vec<f64>), AnalysisError> {
    let mut base = Vec::new();
    let mut comparison = Vec::new();
    for r in results {
        if let (Some(b), Some(c)) = (
            r.cell(baseline, operation.as_str()),
            r.cell(subject, operation.as_str()),
        ) {
            base.push(SeriesPoint::new(r.configuration, b.value));
            comparison.push(SeriesPoint::new(r.configuration, c.value));
        }
    }
    if base.is_empty() {
        return Err(AnalysisError::EmptySeries);
    }

    let mut records = compute_overhead(&base, &comparison, policy)?.into_iter();
    let points = results
        .iter()
        .map(|r| {
            let b = r.cell(baseline, operation.as_str()).map(|c| c.value);
            let c = r.cell(subject, operation.as_str()).map(|c| c.value);
            let missing = |label: &str| AnalysisError::MissingValue {
                configuration: r.configuration.to_string(),
                subject: label.to_string(),
            };
            let error = match (b, c) {
                (None, _) => Some(missing(baseline)),
                (_, None) => Some(missing(subject)),
                (Some(_), Some(_)) => None,
            };
            if let Some(error) = error {
                return OverheadPoint {
                    configuration: r.configuration,
                    baseline: b,
                    comparison: c,
                    raw_comparison: c,
                    overhead_pct: None,
                    error: Some(error),
                };
            }
            match records.next() {
                Some(Ok(record)) => OverheadPoint {
                    configuration: record.key,
                    baseline: Some(record.baseline),
                    comparison: Some(record.comparison),
                    raw_comparison: Some(record.raw_comparison),
                    overhead_pct: Some(record.overhead_pct),
                    error: None,
                },
                Some(Err(e)) => OverheadPoint {
                    configuration: r.configuration,
                    baseline: b,
                    comparison: c,
                    raw_comparison: c,
                    overhead_pct: None,
                    error: Some(e),
                },
                None => OverheadPoint {
                    configuration: r.configuration,
                    baseline: b,
                    comparison: c,
                    raw_comparison: c,
                    overhead_pct: None,
                    error: Some(AnalysisError::EmptySeries),
                },
            }
        })
        .collect();

    let base_values = base.iter().map(|p| p.value).collect();
    let cmp_values = comparison.iter().map(|p| p.value).collect();
    Ok((points, base_values, cmp_values))
}

/// Run every comparison in `plan`
pub fn analyze(results: &[ConfigurationResult], plan: &AnalysisPlan) -> AnalysisOutput {
    let mut out = AnalysisOutput::default();
    let Some(baseline) = plan.baseline.as_deref() else {
        return out;
    };

    for operation in &plan.operations {
        for subject in plan.subjects.iter().filter(|s| s.as_str() != baseline) {
            let context = format!("{subject} vs {baseline} ({operation})");
            let clamped = plan.clamp.contains(subject);
            let policy = OverheadPolicy {
                clamp_non_improvement: clamped,
            };
            let (points, base_values, cmp_values) =
                match overhead_points(results, baseline, subject, operation, policy) {
                    Ok(computed) => computed,
                    Err(e) => {
                        out.issue(context, e);
                        continue;
                    }
                };

            let holes = points
                .iter()
                .filter(|p| matches!(p.error, Some(AnalysisError::MissingValue { .. })))
                .count();
            if holes > 0 {
                warn!(context = %context, holes, "overhead series has missing cells");
            }

            // Totals cover the configurations both sides completed.
            let total_overhead_pct = match total_overhead(&base_values, &cmp_values, policy) {
                Ok(pct) => Some(pct),
                Err(e) => {
                    out.issue(format!("{context} total"), e);
                    None
                }
            };

            out.overheads.push(OverheadSeries {
                subject: subject.clone(),
                baseline: baseline.to_string(),
                operation: operation.clone(),
                clamped,
                points,
                total_overhead_pct,
            });
        }
    }

    for crossover in &plan.crossovers {
        let context = format!(
            "crossover {} / {} ({})",
            crossover.a, crossover.b, crossover.operation
        );
        let a = out.overhead_series(results, baseline, &crossover.a, &crossover.operation);
        let b = out.overhead_series(results, baseline, &crossover.b, &crossover.operation);
        let (Some(a), Some(b)) = (a, b) else {
            out.issue(context, AnalysisError::EmptySeries);
            continue;
        };
        let common = common_points(&[a, b]);
        if common[0].is_empty() {
            out.issue(context, AnalysisError::EmptySeries);
            continue;
        }
        match find_crossover(&common[0], &common[1]) {
            Ok(found) => out.crossovers.push(CrossoverResult {
                a: crossover.a.clone(),
                b: crossover.b.clone(),
                operation: crossover.operation.clone(),
                index: found.index,
                configuration: found.key,
                found: found.found,
            }),
            Err(e) => out.issue(context, e),
        }
    }

    if plan.best_of.len() >= 2 {
        for operation in &plan.operations {
            let context = format!("best of {} ({operation})", plan.best_of.join(", "));
            let series: Option<Vec<_>> = plan
                .best_of
                .iter()
                .map(|label| out.overhead_series(results, baseline, label, operation))
                .collect();
            let Some(series) = series else {
                out.issue(context, AnalysisError::EmptySeries);
                continue;
            };
            let series = common_points(&series);
            if series.iter().any(Vec::is_empty) {
                out.issue(context, AnalysisError::EmptySeries);
                continue;
            }
            let slices: Vec<&[SeriesPoint<Configuration>]> =
                series.iter().map(Vec::as_slice).collect();
            match best_of(&slices) {
                Ok(points) => out.best_of.push(BestOfSeries {
                    operation: operation.clone(),
                    candidates: plan.best_of.clone(),
                    points: points
                        .into_iter()
                        .map(|p| BestOfEntry {
                            configuration: p.key,
                            overhead_pct: p.value,
                            winner: plan.best_of[p.winner].clone(),
                        })
                        .collect(),
                }),
                Err(e) => out.issue(context, e),
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepbench_report::CellStatistic;

    fn results(rows: &[(i64, &[(&str, f64)])]) -> Vec<ConfigurationResult> {
        rows.iter()
            .map(|(config, cells)| {
                let mut r = ConfigurationResult::new(Configuration(*config));
                for (subject, value) in cells.iter() {
                    r.insert(
                        subject,
                        Operation::total(),
                        CellStatistic::from_samples(&[*value], 0).unwrap(),
                    );
                }
                r
            })
            .collect()
    }

    fn plan(subjects: &[&str]) -> AnalysisPlan {
        AnalysisPlan {
            baseline: Some(subjects[0].to_string()),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            operations: vec![Operation::total()],
            ..AnalysisPlan::default()
        }
    }

    fn pct(out: &AnalysisOutput, subject: &str) -> Vec<Option<f64>> {
        out.overheads
            .iter()
            .find(|o| o.subject == subject)
            .unwrap()
            .points
            .iter()
            .map(|p| p.overhead_pct)
            .collect()
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_overhead_and_clamp() {
        let data = results(&[
            (1, &[("base", 1.0), ("variant", 1.5)]),
            (2, &[("base", 2.0), ("variant", 1.8)]),
        ]);
        let out = analyze(&data, &plan(&["base", "variant"]));
        let values = pct(&out, "variant");
        assert!(close(values[0], 50.0));
        assert!(close(values[1], -10.0));

        let mut clamped = plan(&["base", "variant"]);
        clamped.clamp.insert("variant".into());
        let out = analyze(&data, &clamped);
        let values = pct(&out, "variant");
        assert!(close(values[0], 50.0));
        assert!(close(values[1], 0.0));
        assert!(out.overheads[0].clamped);
    }

    #[test]
    fn test_identical_series_zero_overhead() {
        let data = results(&[
            (1, &[("base", 3.0), ("copy", 3.0)]),
            (2, &[("base", 4.0), ("copy", 4.0)]),
        ]);
        let out = analyze(&data, &plan(&["base", "copy"]));
        assert!(pct(&out, "copy").iter().all(|v| close(*v, 0.0)));
        assert!(close(out.overheads[0].total_overhead_pct, 0.0));
    }

    #[test]
    fn test_degenerate_baseline_only_affects_record() {
        let data = results(&[
            (1, &[("base", 0.0), ("variant", 1.0)]),
            (2, &[("base", 2.0), ("variant", 3.0)]),
        ]);
        let out = analyze(&data, &plan(&["base", "variant"]));
        let series = &out.overheads[0];
        assert_eq!(series.points[0].overhead_pct, None);
        assert!(matches!(
            series.points[0].error,
            Some(AnalysisError::DegenerateBaseline { index: 0, .. })
        ));
        assert!(close(series.points[1].overhead_pct, 50.0));
    }

    #[test]
    fn test_missing_cell_stays_local() {
        let data = results(&[
            (1, &[("base", 1.0), ("variant", 1.5)]),
            (2, &[("base", 2.0), ("variant", 3.0)]),
            (3, &[("base", 3.0)]),
            (4, &[("base", 4.0), ("variant", 6.0)]),
        ]);
        let out = analyze(&data, &plan(&["base", "variant"]));

        assert!(out.issues.is_empty());
        let series = &out.overheads[0];
        assert_eq!(series.points.len(), 4);
        let values = pct(&out, "variant");
        assert!(close(values[0], 50.0));
        assert!(close(values[1], 50.0));
        assert_eq!(values[2], None);
        assert!(close(values[3], 50.0));
        assert_eq!(series.points[2].baseline, Some(3.0));
        assert_eq!(series.points[2].comparison, None);
        assert!(matches!(
            &series.points[2].error,
            Some(AnalysisError::MissingValue { subject, .. }) if subject == "variant"
        ));
        // (1.5 + 3 + 6 - 7) / 7
        assert!(close(series.total_overhead_pct, 50.0));
    }

    #[test]
    fn test_crossover_skips_missing_configurations() {
        // overheads: a = [80, 60, -, 10], b = [10, 30, 50, 70]
        let data = results(&[
            (1, &[("base", 1.0), ("a", 1.8), ("b", 1.1)]),
            (2, &[("base", 1.0), ("a", 1.6), ("b", 1.3)]),
            (3, &[("base", 1.0), ("b", 1.5)]),
            (4, &[("base", 1.0), ("a", 1.1), ("b", 1.7)]),
        ]);
        let mut p = plan(&["base", "a", "b"]);
        p.crossovers.push(CrossoverConfig {
            a: "a".into(),
            b: "b".into(),
            operation: Operation::total(),
        });
        p.best_of = vec!["a".into(), "b".into()];
        let out = analyze(&data, &p);

        assert!(out.issues.is_empty());
        assert_eq!(out.crossovers[0].configuration, Configuration(4));
        assert!(out.crossovers[0].found);
        let configs: Vec<Configuration> =
            out.best_of[0].points.iter().map(|p| p.configuration).collect();
        assert_eq!(
            configs,
            vec![Configuration(1), Configuration(2), Configuration(4)]
        );
    }

    #[test]
    fn test_crossover_and_best_of() {
        // overheads: a = [80, 60, 40, 10], b = [10, 30, 50, 70]
        let data = results(&[
            (1, &[("base", 1.0), ("a", 1.8), ("b", 1.1)]),
            (2, &[("base", 1.0), ("a", 1.6), ("b", 1.3)]),
            (3, &[("base", 1.0), ("a", 1.4), ("b", 1.5)]),
            (4, &[("base", 1.0), ("a", 1.1), ("b", 1.7)]),
        ]);
        let mut p = plan(&["base", "a", "b"]);
        p.crossovers.push(CrossoverConfig {
            a: "a".into(),
            b: "b".into(),
            operation: Operation::total(),
        });
        p.best_of = vec!["a".into(), "b".into()];
        let out = analyze(&data, &p);

        assert_eq!(out.crossovers.len(), 1);
        let crossover = &out.crossovers[0];
        assert_eq!(crossover.index, 2);
        assert_eq!(crossover.configuration, Configuration(3));
        assert!(crossover.found);

        let best = &out.best_of[0];
        let winners: Vec<&str> = best.points.iter().map(|p| p.winner.as_str()).collect();
        assert_eq!(winners, vec!["b", "b", "a", "a"]);
        assert!((best.points[3].overhead_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_crossover_not_found_reports_last() {
        let data = results(&[
            (1, &[("base", 1.0), ("a", 2.0), ("b", 1.0)]),
            (2, &[("base", 1.0), ("a", 2.0), ("b", 1.0)]),
        ]);
        let mut p = plan(&["base", "a", "b"]);
        p.crossovers.push(CrossoverConfig {
            a: "a".into(),
            b: "b".into(),
            operation: Operation::total(),
        });
        let out = analyze(&data, &p);
        assert_eq!(out.crossovers[0].configuration, Configuration(2));
        assert!(!out.crossovers[0].found);
    }

    #[test]
    fn test_empty_series_is_issue() {
        let data = results(&[(1, &[("base", 1.0)])]);
        let out = analyze(&data, &plan(&["base", "ghost"]));
        assert!(out.overheads.is_empty());
        assert_eq!(out.issues[0].error, AnalysisError::EmptySeries);
    }
}
