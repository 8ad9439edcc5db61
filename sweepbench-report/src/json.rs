//! JSON Output
//!
//! Two shapes are written:
//! - `report.json`: the full `Report`
//! - `series-<operation>.json`: flat arrays ready for a plotting tool

use crate::report::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};

/// Identifier stored in `meta.schema`
pub const REPORT_SCHEMA: &str = "sweepbench-report";

/// Version stored in `meta.schema_version`, bumped on breaking changes
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSchema {
    /// Schema identifier
    pub schema: String,
    /// Schema version
    pub version: u32,
}

impl Default for ReportSchema {
    fn default() -> Self {
        Self {
            schema: REPORT_SCHEMA.to_string(),
            version: REPORT_SCHEMA_VERSION,
        }
    }
}

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Plot series for one operation
///
/// ```json
/// { "schema": ..., "operation": "total", "xs": [1, 10, 100],
///   "ys_base": [...], "ys_variant": [...], "overhead_variant": [...] }
/// ```
///
/// Every array is aligned with `xs`; missing cells and degenerate
/// overheads are `null`.
pub fn generate_series_json(report: &Report, operation: &str) -> Value {
    let configurations = report.configurations();
    let mut out = Map::new();
    out.insert("schema".into(), serde_json::json!(ReportSchema::default()));
    out.insert("operation".into(), Value::from(operation));
    out.insert(
        "xs".into(),
        configurations.iter().map(|c| c.value()).collect::<Vec<_>>().into(),
    );

    for subject in report.subjects() {
        let ys: Vec<Value> = report
            .results
            .iter()
            .map(|r| {
                r.cell(&subject, operation)
                    .map_or(Value::Null, |c| Value::from(c.value))
            })
            .collect();
        out.insert(format!("ys_{subject}"), Value::Array(ys));
    }

    for series in report
        .overheads
        .iter()
        .filter(|o| o.operation.as_str() == operation)
    {
        let values: Vec<Value> = configurations
            .iter()
            .map(|config| {
                series
                    .points
                    .iter()
                    .find(|p| p.configuration == *config)
                    .and_then(|p| p.overhead_pct)
                    .map_or(Value::Null, Value::from)
            })
            .collect();
        out.insert(format!("overhead_{}", series.subject), Value::Array(values));
    }

    Value::Object(out)
}

fn file_stem(operation: &str) -> String {
    operation
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write `report.json`, one `series-<operation>.json` per operation and,
/// when asked, `report.csv` into `dir`
///
/// Returns the written paths.
pub fn write_report_files(report: &Report, dir: &Path, csv: bool) -> io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let path = dir.join("report.json");
    std::fs::write(&path, generate_json_report(report)?)?;
    written.push(path);

    for operation in report.operations() {
        let path = dir.join(format!("series-{}.json", file_stem(operation.as_str())));
        let series = generate_series_json(report, operation.as_str());
        std::fs::write(&path, serde_json::to_string_pretty(&series)?)?;
        written.push(path);
    }

    if csv {
        let path = dir.join("report.csv");
        std::fs::write(&path, crate::csv::generate_csv_report(report))?;
        written.push(path);
    }

    Ok(written)
}
