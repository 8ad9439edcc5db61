//! End-to-end tests: sweep, execute, aggregate, analyze and export.

use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use sweepbench::prelude::*;
use sweepbench::{
    AnalysisError, FailureCause, FailurePolicy, OverheadPolicy, SeriesPoint, compute_overhead, process_subjects,
    trimmed_mean, write_report_files,
};

/// Deterministic subject: `total = size * factor(size)`
fn scaled(label: &str, factor: fn(i64) -> f64) -> Arc<dyn Subject> {
    Arc::new(FnSubject::new(label, move |scope| {
        let n = scope.size();
        scope.record("total", n as f64 * factor(n));
        Ok(())
    }))
}

fn config(from: i64, to: i64) -> SweepConfig {
    let mut config = SweepConfig::default();
    config.sweep = SweepSpec::linear(from, to, 1);
    config.runner.repetitions = 3;
    config.runner.drop = 1;
    config
}

#[test]
fn test_overhead_against_baseline() {
    let mut config = config(1, 2);
    config.analysis.baseline = Some("base".into());
    let subjects = vec![
        scaled("base", |_| 1.0),
        scaled("variant", |n| if n == 1 { 1.5 } else { 0.9 }),
    ];

    let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();

    assert_eq!(report.configurations(), vec![Configuration(1), Configuration(2)]);
    let cell = report.results[0].cell("variant", "total").unwrap();
    assert!((cell.value - 1.5).abs() < 1e-12);
    assert_eq!(cell.samples, 3);
    assert_eq!(cell.retained, 1);

    let overhead = report.overhead("variant", "total").unwrap();
    let pcts: Vec<f64> = overhead.points.iter().map(|p| p.overhead_pct.unwrap()).collect();
    assert!((pcts[0] - 50.0).abs() < 1e-9);
    assert!((pcts[1] + 10.0).abs() < 1e-9);
    // (1.5 + 1.8 - 3.0) / 3.0
    assert!((overhead.total_overhead_pct.unwrap() - 10.0).abs() < 1e-9);
    assert!(report.failures.is_empty());
    assert_eq!(report.summary.missing_cells, 0);
}

#[test]
fn test_clamped_subject_never_improves() {
    let mut config = config(1, 2);
    config.analysis.clamp = vec!["variant".into()];
    let subjects = vec![
        scaled("base", |_| 1.0),
        scaled("variant", |n| if n == 1 { 1.5 } else { 0.9 }),
    ];

    let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();
    let overhead = report.overhead("variant", "total").unwrap();
    assert!(overhead.clamped);
    let pcts: Vec<f64> = overhead.points.iter().map(|p| p.overhead_pct.unwrap()).collect();
    assert!((pcts[0] - 50.0).abs() < 1e-9);
    assert_eq!(pcts[1], 0.0);
}

#[test]
fn test_failed_trials_do_not_stop_the_sweep() {
    let config = config(1, 3);
    let subjects = vec![
        scaled("base", |_| 1.0),
        Arc::new(FnSubject::new("flaky", |scope| {
            if scope.size() == 2 {
                return Err("disk full".to_string());
            }
            scope.record("total", 2.0);
            Ok(())
        })) as Arc<dyn Subject>,
    ];

    let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();

    assert_eq!(report.configurations().len(), 3);
    assert!(!report.summary.aborted);
    assert_eq!(report.failures.len(), 3);
    assert!(report.failures.iter().all(|f| f.subject == "flaky"
        && f.configuration == Configuration(2)
        && matches!(&f.cause, FailureCause::Workload { message } if message == "disk full")));

    assert!(report.results[1].cell("flaky", "total").is_none());
    assert!(report.results[2].cell("flaky", "total").is_some());
    assert_eq!(report.summary.missing_cells, 1);

    // The hole only affects its own point.
    let overhead = report.overhead("flaky", "total").unwrap();
    assert_eq!(overhead.points.len(), 3);
    assert_eq!(overhead.points[1].overhead_pct, None);
    assert!(matches!(
        overhead.points[1].error,
        Some(AnalysisError::MissingValue { .. })
    ));
    // flaky records 2.0 everywhere: (2 + 2 - 1 - 3) / 4
    assert!(overhead.points[0].overhead_pct.is_some());
    assert!((overhead.total_overhead_pct.unwrap() - 0.0).abs() < 1e-9);
    assert!(report.analysis_errors.is_empty());
}

#[test]
fn test_abort_policy_stops_after_current_configuration() {
    let mut config = config(1, 4);
    config.runner.failure_policy = FailurePolicy::Abort;
    let subjects = vec![
        scaled("base", |_| 1.0),
        Arc::new(FnSubject::new("broken", |scope| {
            if scope.size() >= 2 {
                panic!("corrupt page");
            }
            scope.record("total", 1.0);
            Ok(())
        })) as Arc<dyn Subject>,
    ];

    let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();

    assert!(report.summary.aborted);
    assert_eq!(report.configurations(), vec![Configuration(1), Configuration(2)]);
    assert!(report.failures.iter().all(|f| matches!(f.cause, FailureCause::Panicked { .. })));
    assert!(report.results[1].cell("base", "total").is_some());
}

#[test]
fn test_retry_policy_recovers_transient_failures() {
    let mut config = config(1, 1);
    config.runner.repetitions = 1;
    config.runner.drop = 0;
    config.runner.failure_policy = FailurePolicy::Retry(2);

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let subjects = vec![Arc::new(FnSubject::new("retry", move |scope| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err("transient".to_string());
        }
        scope.record("total", 1.0);
        Ok(())
    })) as Arc<dyn Subject>];

    let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(report.failures.is_empty());
    assert!(report.results[0].cell("retry", "total").is_some());
}

#[test]
fn test_crossover_and_best_of() {
    let mut config = config(1, 4);
    config.analysis.baseline = Some("base".into());
    config.analysis.crossovers = vec![sweepbench_cli::CrossoverConfig {
        a: "index".into(),
        b: "scan".into(),
        operation: Operation::total(),
    }];
    config.analysis.best_of = vec!["index".into(), "scan".into()];
    let subjects = vec![
        scaled("base", |_| 1.0),
        // index: 100, 50, 20, 10 percent overhead
        scaled("index", |n| [2.0, 1.5, 1.2, 1.1][(n - 1) as usize]),
        // scan: 10, 20, 30, 40 percent overhead
        scaled("scan", |n| [1.1, 1.2, 1.3, 1.4][(n - 1) as usize]),
    ];

    let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();

    let crossover = &report.crossovers[0];
    assert!(crossover.found);
    assert_eq!(crossover.index, 2);
    assert_eq!(crossover.configuration, Configuration(3));

    let winners: Vec<&str> = report.best_of[0].points.iter().map(|p| p.winner.as_str()).collect();
    assert_eq!(winners, vec!["scan", "scan", "index", "index"]);
}

#[test]
fn test_cancelled_before_start_runs_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run_sweep(&config(1, 3), vec![scaled("base", |_| 1.0)], &cancel).unwrap();
    assert!(report.summary.cancelled);
    assert!(report.results.is_empty());
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut bad = config(5, 1);
    assert!(run_sweep(&bad, vec![scaled("base", |_| 1.0)], &CancellationToken::new()).is_err());

    bad = config(1, 2);
    bad.analysis.baseline = Some("missing".into());
    assert!(run_sweep(&bad, vec![scaled("base", |_| 1.0)], &CancellationToken::new()).is_err());
}

#[test]
fn test_report_files_round_trip() {
    let subjects = vec![scaled("base", |_| 1.0), scaled("variant", |_| 1.25)];
    let report = run_sweep(&config(1, 3), subjects, &CancellationToken::new()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = write_report_files(&report, dir.path(), true).unwrap();
    assert!(written.iter().any(|p| p.ends_with("report.json")));
    assert!(written.iter().any(|p| p.ends_with("report.csv")));

    let json = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
    let parsed: Report = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.configurations(), report.configurations());
    assert_eq!(parsed.meta.schema, sweepbench_report::REPORT_SCHEMA);

    let series = std::fs::read_to_string(dir.path().join("series-total.json")).unwrap();
    let series: serde_json::Value = serde_json::from_str(&series).unwrap();
    assert_eq!(series["xs"], serde_json::json!([1, 2, 3]));
    let overhead = series["overhead_variant"].as_array().unwrap();
    assert!((overhead[0].as_f64().unwrap() - 25.0).abs() < 1e-9);
}

#[test]
fn test_human_output_mentions_subjects() {
    let subjects = vec![scaled("base", |_| 1.0), scaled("variant", |_| 2.0)];
    let report = run_sweep(&config(1, 2), subjects, &CancellationToken::new()).unwrap();
    let text = format_human_output(&report);
    assert!(text.contains("base"));
    assert!(text.contains("variant"));
}

#[cfg(unix)]
mod process {
    use super::*;

    fn sweep_from_toml(body: &str) -> SweepConfig {
        toml::from_str(body).unwrap()
    }

    #[test]
    fn test_process_subjects_report_timings() {
        let config = sweep_from_toml(
            r#"
            [sweep]
            from = 1
            to = 2

            [runner]
            repetitions = 2

            [[subjects]]
            label = "base"
            program = "/bin/sh"
            args = ["-c", "echo 'TOTAL TIME: {config}.0s'"]

            [[subjects]]
            label = "variant"
            program = "/bin/sh"
            args = ["-c", "echo 'TOTAL TIME: {config}.5s'"]
            "#,
        );

        let subjects = process_subjects(&config).unwrap();
        let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();

        assert!(report.failures.is_empty(), "{:?}", report.failures);
        let cell = report.results[1].cell("variant", "total").unwrap();
        assert!((cell.value - 2.5).abs() < 1e-12);
        let overhead = report.overhead("variant", "total").unwrap();
        assert!((overhead.points[0].overhead_pct.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_process_failures_are_classified() {
        let config = sweep_from_toml(
            r#"
            [sweep]
            from = 1
            to = 1

            [runner]
            repetitions = 1
            timeout = "200ms"

            [[subjects]]
            label = "crash"
            program = "/bin/sh"
            args = ["-c", "echo boom >&2; exit 3"]

            [[subjects]]
            label = "hang"
            program = "/bin/sh"
            args = ["-c", "sleep 5"]

            [[subjects]]
            label = "garbled"
            program = "/bin/sh"
            args = ["-c", "echo nothing useful"]
            "#,
        );

        let subjects = process_subjects(&config).unwrap();
        let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();
        let cause = |label: &str| {
            &report
                .failures
                .iter()
                .find(|f| f.subject == label)
                .unwrap()
                .cause
        };

        assert!(matches!(
            cause("crash"),
            FailureCause::NonZeroExit { code: Some(3), stderr } if stderr.contains("boom")
        ));
        assert!(matches!(cause("hang"), FailureCause::Timeout { timeout_ms: 200 }));
        assert!(matches!(
            cause("garbled"),
            FailureCause::Unparseable { .. } | FailureCause::MissingOperation
        ));
        assert_eq!(report.summary.failed_trials, 3);
    }
}

proptest! {
    #[test]
    fn prop_trimmed_mean_within_retained_range(
        mut samples in prop::collection::vec(0.0f64..1e6, 1..40),
        drop in 0usize..10,
    ) {
        prop_assume!(2 * drop < samples.len());
        let agg = trimmed_mean(&samples, drop).unwrap();
        samples.sort_by(|a, b| a.total_cmp(b));
        let kept = &samples[drop..samples.len() - drop];
        prop_assert!(agg.value >= kept[0] - 1e-9);
        prop_assert!(agg.value <= kept[kept.len() - 1] + 1e-9);
        prop_assert_eq!(agg.retained, kept.len());
    }

    #[test]
    fn prop_clamped_overhead_is_non_negative(
        pairs in prop::collection::vec((0.001f64..1e3, 0.001f64..1e3), 1..20),
    ) {
        let base: Vec<_> = pairs.iter().enumerate().map(|(i, p)| SeriesPoint::new(i, p.0)).collect();
        let cmp: Vec<_> = pairs.iter().enumerate().map(|(i, p)| SeriesPoint::new(i, p.1)).collect();
        let records = compute_overhead(&base, &cmp, OverheadPolicy::clamped()).unwrap();
        for record in records {
            prop_assert!(record.unwrap().overhead_pct >= 0.0);
        }
    }
}
