//! CSV Output
//!
//! One row per (configuration, subject, operation) cell. Overhead is
//! filled in for subjects that were compared against the baseline.

use crate::report::Report;

const HEADER: &str =
    "configuration,subject,operation,value,samples,retained,mean,std_dev,min,max,median,overhead_pct";

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Generate a CSV table of every measured cell
pub fn generate_csv_report(report: &Report) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    for result in &report.results {
        for (subject, cells) in &result.subjects {
            for (operation, cell) in cells {
                let overhead = report
                    .overhead(subject, operation.as_str())
                    .and_then(|o| {
                        o.points
                            .iter()
                            .find(|p| p.configuration == result.configuration)
                    })
                    .and_then(|p| p.overhead_pct)
                    .map(|v| format!("{v:.4}"))
                    .unwrap_or_default();

                out.push_str(&format!(
                    "{},{},{},{:.9},{},{},{:.9},{:.9},{:.9},{:.9},{:.9},{}\n",
                    result.configuration,
                    escape(subject),
                    escape(operation.as_str()),
                    cell.value,
                    cell.samples,
                    cell.retained,
                    cell.mean,
                    cell.std_dev,
                    cell.min,
                    cell.max,
                    cell.median,
                    overhead
                ));
            }
        }
    }
    out
}
