//! Output Formatting
//!
//! Human-readable output for sweep reports. One table per operation with a
//! row per configuration, a column per subject and a column per overhead
//! series, followed by crossovers, best-of winners, missing cells, failed
//! trials and the run summary.

use sweepbench_report::{Report, format_duration};

fn section(output: &mut String, title: &str) {
    output.push_str(&format!("\n{}\n", title));
    output.push_str(&"-".repeat(60));
    output.push('\n');
}

fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.2}%", v),
        None => "-".to_string(),
    }
}

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("SweepBench Results\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');

    let subjects = report.subjects();
    let col_width = 12;

    for operation in report.operations() {
        section(&mut output, &format!("Operation: {}", operation));

        let overheads: Vec<_> = report
            .overheads
            .iter()
            .filter(|o| o.operation == operation)
            .collect();

        // Header row
        output.push_str(&format!("  {:>14}", "configuration"));
        for subject in &subjects {
            output.push_str(&format!(" | {:>w$}", subject, w = col_width));
        }
        for series in &overheads {
            let title = format!("{} ovh", series.subject);
            output.push_str(&format!(" | {:>w$}", title, w = col_width));
        }
        output.push('\n');
        output.push_str(&format!("  {}", "-".repeat(14)));
        for _ in 0..subjects.len() + overheads.len() {
            output.push_str(&format!("-+-{}", "-".repeat(col_width)));
        }
        output.push('\n');

        // Data rows
        for result in &report.results {
            output.push_str(&format!("  {:>14}", result.configuration));
            for subject in &subjects {
                let value = result
                    .cell(subject, operation.as_str())
                    .map(|c| format_duration(c.value))
                    .unwrap_or_else(|| "-".to_string());
                output.push_str(&format!(" | {:>w$}", value, w = col_width));
            }
            for series in &overheads {
                let pct = series
                    .points
                    .iter()
                    .find(|p| p.configuration == result.configuration)
                    .and_then(|p| p.overhead_pct);
                output.push_str(&format!(" | {:>w$}", format_pct(pct), w = col_width));
            }
            output.push('\n');
        }

        for series in &overheads {
            let clamp = if series.clamped { " (clamped)" } else { "" };
            output.push_str(&format!(
                "  total overhead of {} over {}: {}{}\n",
                series.subject,
                series.baseline,
                format_pct(series.total_overhead_pct),
                clamp
            ));
        }
    }

    if !report.crossovers.is_empty() {
        section(&mut output, "Crossovers");
        for c in &report.crossovers {
            if c.found {
                output.push_str(&format!(
                    "  {} drops to or below {} at {} ({})\n",
                    c.a, c.b, c.configuration, c.operation
                ));
            } else {
                output.push_str(&format!(
                    "  {} stays above {} through {} ({})\n",
                    c.a, c.b, c.configuration, c.operation
                ));
            }
        }
    }

    for best in &report.best_of {
        section(
            &mut output,
            &format!("Best of {} ({})", best.candidates.join(", "), best.operation),
        );
        for point in &best.points {
            output.push_str(&format!(
                "  {:>14}  {:>10}  {}\n",
                point.configuration,
                format_pct(Some(point.overhead_pct)),
                point.winner
            ));
        }
    }

    if !report.missing_cells.is_empty() {
        section(&mut output, "Missing cells");
        for m in &report.missing_cells {
            output.push_str(&format!(
                "  ✗ {} @ {} [{}]: {}\n",
                m.subject, m.configuration, m.operation, m.cause
            ));
        }
    }

    if !report.failures.is_empty() {
        section(&mut output, "Failed trials");
        for f in &report.failures {
            output.push_str(&format!(
                "  ✗ {} @ {} [{}]: {}\n",
                f.subject, f.configuration, f.operation, f.cause
            ));
        }
    }

    if !report.analysis_errors.is_empty() {
        section(&mut output, "Analysis errors");
        for issue in &report.analysis_errors {
            output.push_str(&format!("  ✗ {}: {}\n", issue.context, issue.error));
        }
    }

    // Summary
    section(&mut output, "Summary");
    let s = &report.summary;
    output.push_str(&format!(
        "  Configurations: {}  Subjects: {}  Operations: {}\n",
        s.configurations, s.subjects, s.operations
    ));
    output.push_str(&format!(
        "  Cells: {}  Missing: {}  Failed trials: {}  Analysis errors: {}\n",
        s.cells, s.missing_cells, s.failed_trials, s.analysis_errors
    ));
    if s.aborted {
        output.push_str("  Sweep aborted after a failed configuration\n");
    }
    if s.cancelled {
        output.push_str("  Sweep cancelled\n");
    }
    output.push_str(&format!("  Duration: {:.2} ms\n", s.total_duration_ms));

    output
}
