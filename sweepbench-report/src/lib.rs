#![warn(missing_docs)]
//! SweepBench Report - Result Exchange Format
//!
//! The stable, serializable shape of a finished sweep:
//! Configuration → Subject → Operation → statistic, plus the derived
//! overhead series, crossovers and best-of curves.
//!
//! Output formats:
//! - JSON report (machine-readable, schema-tagged)
//! - Plot series JSON per operation (`xs`, `ys_<label>`, `overhead_<label>`)
//! - CSV (one row per cell)

mod csv;
mod json;
mod report;

pub use csv::generate_csv_report;
pub use json::{
    REPORT_SCHEMA, REPORT_SCHEMA_VERSION, ReportSchema, generate_json_report,
    generate_series_json, write_report_files,
};
pub use report::{
    AnalysisIssue, BestOfEntry, BestOfSeries, CellStatistic, ConfigurationResult,
    CrossoverResult, MissingCell, OverheadPoint, OverheadSeries, Report, ReportConfig, ReportMeta,
    ReportSummary, SystemInfo,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// JSON with full schema
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Format seconds with a unit suited to the magnitude
pub fn format_duration(secs: f64) -> String {
    if !secs.is_finite() {
        return "-".to_string();
    }
    let abs = secs.abs();
    if abs >= 1.0 {
        format!("{:.3} s", secs)
    } else if abs >= 1e-3 {
        format!("{:.3} ms", secs * 1e3)
    } else if abs >= 1e-6 {
        format!("{:.3} us", secs * 1e6)
    } else {
        format!("{:.0} ns", secs * 1e9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Human);
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(2.5), "2.500 s");
        assert_eq!(format_duration(0.0125), "12.500 ms");
        assert_eq!(format_duration(0.000_004), "4.000 us");
        assert_eq!(format_duration(5e-9), "5 ns");
        assert_eq!(format_duration(f64::NAN), "-");
    }
}
