//! Subject Output Parsing
//!
//! Process subjects report their own timings on stdout. The supported
//! shapes:
//!
//! | kind        | example stdout                          |
//! |-------------|-----------------------------------------|
//! | `total`     | `TOTAL....... 1.234s`                   |
//! | `list`      | `[0.1, 0.2, 0.3, 0.4]`                  |
//! | `json`      | `{"insert": 0.1, "select": 0.2}`        |
//! | `key-value` | `insert time: 0.1`                      |
//!
//! `key-value` takes an optional pattern whose first group is the operation
//! name and second group the seconds, e.g. for numbered test lines like
//! `130 - 10000 SELECTS on an IPK.....  0.042s`.
//! | `wall-clock`| ignored, the supervisor times the child |

use crate::{FailureCause, Operation, OperationTimings};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default pattern for the `total` format
pub const DEFAULT_TOTAL_PATTERN: &str = r"TOTAL.*?(\d+\.\d+)s";

const LIST_PATTERN: &str = r"\[([^\[\]]*)\]";
const KEY_VALUE_PATTERN: &str = r"(?m)^\s*(.+?)\s+time:\s*([-+0-9eE.]+)";

/// How a subject reports its timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One total elapsed time captured by a regex group
    Total {
        /// Pattern whose first capture group is the elapsed seconds
        #[serde(default)]
        pattern: Option<String>,
    },
    /// A bracketed list of numbers, one per named operation
    List {
        /// Operation names in list order
        operations: Vec<Operation>,
    },
    /// A flat JSON object of operation name to seconds
    Json,
    /// Lines of `<operation> time: <seconds>`, or any pattern capturing
    /// the operation name then the seconds; repeated names are summed
    KeyValue {
        /// Pattern with two capture groups: operation name, seconds
        #[serde(default)]
        pattern: Option<String>,
    },
    /// Harness-measured wall time of the whole process
    WallClock,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Total { pattern: None }
    }
}

impl OutputFormat {
    /// Whether the timing comes from the harness rather than the output
    pub fn is_wall_clock(&self) -> bool {
        matches!(self, OutputFormat::WallClock)
    }
}

/// Compiled parser for one output format
#[derive(Debug, Clone)]
pub struct OutputParser {
    format: OutputFormat,
    regex: Option<Regex>,
}

impl OutputParser {
    /// Compile the parser, rejecting invalid patterns up front
    pub fn new(format: OutputFormat) -> Result<Self, regex::Error> {
        let regex = match &format {
            OutputFormat::Total { pattern } => Some(Regex::new(
                pattern.as_deref().unwrap_or(DEFAULT_TOTAL_PATTERN),
            )?),
            OutputFormat::List { .. } => Some(Regex::new(LIST_PATTERN)?),
            OutputFormat::KeyValue { pattern } => Some(Regex::new(
                pattern.as_deref().unwrap_or(KEY_VALUE_PATTERN),
            )?),
            OutputFormat::Json | OutputFormat::WallClock => None,
        };
        Ok(Self { format, regex })
    }

    /// The format being parsed
    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    /// Extract operation timings from a subject's stdout
    ///
    /// `wall-clock` always yields an empty map.
    pub fn parse(&self, stdout: &str) -> Result<OperationTimings, FailureCause> {
        match (&self.format, &self.regex) {
            (OutputFormat::Total { .. }, Some(re)) => parse_total(re, stdout),
            (OutputFormat::List { operations }, Some(re)) => parse_list(re, operations, stdout),
            (OutputFormat::KeyValue { .. }, Some(re)) => parse_key_value(re, stdout),
            (OutputFormat::Json, _) => parse_json(stdout),
            _ => Ok(OperationTimings::new()),
        }
    }
}

fn unparseable(message: impl Into<String>) -> FailureCause {
    FailureCause::Unparseable {
        message: message.into(),
    }
}

fn parse_number(text: &str) -> Result<f64, FailureCause> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| unparseable(format!("'{}' is not a number", text.trim())))
}

fn parse_total(re: &Regex, stdout: &str) -> Result<OperationTimings, FailureCause> {
    let caps = re
        .captures(stdout)
        .ok_or_else(|| unparseable(format!("no match for pattern {}", re.as_str())))?;
    let value = caps
        .get(1)
        .ok_or_else(|| unparseable("pattern has no capture group"))?;

    let mut timings = OperationTimings::new();
    timings.insert(Operation::total(), parse_number(value.as_str())?);
    Ok(timings)
}

fn parse_list(
    re: &Regex,
    operations: &[Operation],
    stdout: &str,
) -> Result<OperationTimings, FailureCause> {
    let caps = re
        .captures(stdout)
        .ok_or_else(|| unparseable("no bracketed list in output"))?;
    let values = caps[1]
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_number)
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() != operations.len() {
        return Err(unparseable(format!(
            "expected {} values, found {}",
            operations.len(),
            values.len()
        )));
    }

    let mut timings: OperationTimings = operations.iter().cloned().zip(values).collect();
    let total = Operation::total();
    if !timings.contains_key(&total) {
        let sum = timings.values().sum();
        timings.insert(total, sum);
    }
    Ok(timings)
}

fn parse_json(stdout: &str) -> Result<OperationTimings, FailureCause> {
    let candidate = stdout.trim();
    let parsed = serde_json::from_str::<BTreeMap<String, f64>>(candidate).or_else(|err| {
        // Subjects may log before printing the object; try the last line.
        match candidate.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(last) => serde_json::from_str::<BTreeMap<String, f64>>(last.trim()),
            None => Err(err),
        }
    });
    let map = parsed.map_err(|e| unparseable(format!("invalid timing object: {e}")))?;
    Ok(map.into_iter().map(|(k, v)| (Operation::from(k), v)).collect())
}

fn parse_key_value(re: &Regex, stdout: &str) -> Result<OperationTimings, FailureCause> {
    let mut timings = OperationTimings::new();
    for caps in re.captures_iter(stdout) {
        let (Some(name), Some(secs)) = (caps.get(1), caps.get(2)) else {
            return Err(unparseable(format!(
                "pattern {} needs two capture groups",
                re.as_str()
            )));
        };
        let secs = parse_number(secs.as_str())?;
        *timings.entry(Operation::from(name.as_str().trim())).or_insert(0.0) += secs;
    }
    if timings.is_empty() {
        return Err(unparseable(format!("no match for pattern {}", re.as_str())));
    }
    Ok(timings)
}
