#![warn(missing_docs)]
//! SweepBench CLI Library
//!
//! Loads a `sweep.toml`, runs every subject across the sweep and writes the
//! report. Use `sweepbench_cli::run()` in a main function for the full
//! command line, or `run_sweep` to drive in-process subjects from code.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sweepbench_cli::{SweepConfig, run_sweep};
//! use sweepbench_core::{CancellationToken, FnSubject, Subject, SweepSpec};
//!
//! let mut config = SweepConfig::default();
//! config.sweep = SweepSpec::exponential(1, 4, 1);
//! let subjects: Vec<Arc<dyn Subject>> = vec![
//!     Arc::new(FnSubject::new("vec", |scope| {
//!         let n = scope.size() as usize;
//!         scope.measure("total", || (0..n).collect::<Vec<_>>());
//!         Ok(())
//!     })),
//! ];
//! let report = run_sweep(&config, subjects, &CancellationToken::new()).unwrap();
//! ```

mod config;
mod executor;
mod signals;
mod supervisor;

pub use config::*;
pub use executor::{
    AnalysisOutput, AnalysisPlan, ExecutionConfig, SampleSet, SweepOutcome, SweepRunner,
    analyze, build_report, compute_statistics, format_human_output, series_of,
};
pub use signals::{cancel_on_interrupt, interrupted};
pub use supervisor::*;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sweepbench_core::{CancellationToken, Subject};
use sweepbench_report::{
    OutputFormat, Report, ReportConfig, generate_csv_report, generate_json_report,
    write_report_files,
};
use tracing::info;

/// SweepBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "sweepbench")]
#[command(author, version, about = "SweepBench - comparative benchmarking across parameter sweeps")]
pub struct Cli {
    /// Optional subcommand (Run, Plan, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to sweep.toml (default: discovered from the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// First sweep value
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub from: Option<i64>,

    /// Last sweep value (inclusive)
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub to: Option<i64>,

    /// Sweep increment
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub step: Option<i64>,

    /// Sweep powers of ten
    #[arg(long, global = true)]
    pub exponential: bool,

    /// Trials per subject and configuration
    #[arg(short, long, global = true)]
    pub repetitions: Option<usize>,

    /// Samples dropped from each end before averaging
    #[arg(short, long, global = true)]
    pub drop: Option<usize>,

    /// Concurrent trials
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Terminal output format: human, json, csv
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Directory for report.json and series files
    #[arg(short, long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Also write report.csv
    #[arg(long, global = true)]
    pub csv: bool,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sweep (default)
    Run,
    /// Print configurations and subjects without running anything
    Plan,
    /// Print a default sweep.toml
    Init,
}

/// How a run ended, once its reports were written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every trial produced its timings
    Success,
    /// The sweep finished but some trials failed permanently
    TrialsFailed,
    /// The abort policy stopped the sweep
    Aborted,
    /// An interrupt stopped the sweep
    Cancelled,
}

impl RunStatus {
    /// Status of a finished report; cancellation wins over abort
    pub fn of(report: &Report) -> Self {
        let s = &report.summary;
        if s.cancelled {
            RunStatus::Cancelled
        } else if s.aborted {
            RunStatus::Aborted
        } else if s.failed_trials > 0 {
            RunStatus::TrialsFailed
        } else {
            RunStatus::Success
        }
    }

    /// Process exit code
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Aborted => 1,
            RunStatus::TrialsFailed => 2,
            RunStatus::Cancelled => 130,
        }
    }
}

/// Run the SweepBench CLI with the given arguments.
///
/// Exits with [`RunStatus::exit_code`] when the run did not fully succeed.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let status = run_with_cli(cli)?;
    if status != RunStatus::Success {
        std::process::exit(status.exit_code());
    }
    Ok(())
}

/// Run the SweepBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<RunStatus> {
    // Logs go to stderr so stdout stays parseable for json/csv output.
    let filter = if cli.verbose {
        "sweepbench=debug"
    } else {
        "sweepbench=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Some(Commands::Init) => {
            print!("{}", SweepConfig::default_toml());
            Ok(RunStatus::Success)
        }
        Some(Commands::Plan) => {
            let config = load_config(&cli)?;
            print!("{}", format_plan(&config)?);
            Ok(RunStatus::Success)
        }
        Some(Commands::Run) | None => run_from_cli(&cli),
    }
}

/// Load sweep.toml and apply command-line overrides
fn load_config(cli: &Cli) -> anyhow::Result<SweepConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => SweepConfig::discover().with_context(|| {
            format!(
                "no {} found in this or any parent directory (create one with `sweepbench init`)",
                CONFIG_FILE
            )
        })?,
    };
    info!("using configuration {}", path.display());
    let mut config = SweepConfig::load(&path)?;
    apply_overrides(cli, &mut config);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut SweepConfig) {
    if let Some(from) = cli.from {
        config.sweep.from = from;
    }
    if let Some(to) = cli.to {
        config.sweep.to = to;
    }
    if let Some(step) = cli.step {
        config.sweep.step = step;
    }
    if cli.exponential {
        config.sweep.exponential = true;
    }
    if let Some(repetitions) = cli.repetitions {
        config.runner.repetitions = repetitions;
    }
    if let Some(drop) = cli.drop {
        config.runner.drop = drop;
    }
    if let Some(jobs) = cli.jobs {
        config.runner.jobs = jobs;
    }
    if let Some(format) = &cli.format {
        config.output.format = format.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.to_string_lossy().into_owned();
    }
    if cli.csv {
        config.output.csv = true;
    }
}

/// Build process subjects for every `[[subjects]]` entry
pub fn process_subjects(config: &SweepConfig) -> anyhow::Result<Vec<Arc<dyn Subject>>> {
    let timeout = Duration::from_nanos(config.timeout_ns()?);
    config
        .subjects
        .iter()
        .map(|s| {
            ProcessSubject::from_config(s, timeout)
                .map(|p| Arc::new(p) as Arc<dyn Subject>)
                .map_err(anyhow::Error::from)
        })
        .collect()
}

/// Run `subjects` across the sweep in `config` and build the report
///
/// Trial failures never make this return `Err`; they are listed in the
/// report. Errors are reserved for invalid configuration.
pub fn run_sweep(
    config: &SweepConfig,
    subjects: Vec<Arc<dyn Subject>>,
    cancel: &CancellationToken,
) -> anyhow::Result<Report> {
    execute_sweep(config, subjects, cancel, false)
}

fn execute_sweep(
    config: &SweepConfig,
    subjects: Vec<Arc<dyn Subject>>,
    cancel: &CancellationToken,
    show_progress: bool,
) -> anyhow::Result<Report> {
    let labels: Vec<String> = subjects.iter().map(|s| s.label().to_string()).collect();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    config.validate_for(&label_refs)?;
    if subjects.is_empty() {
        anyhow::bail!("no subjects to run");
    }

    let configurations = config.sweep.configurations()?;
    let mut exec = ExecutionConfig::from(config);
    exec.show_progress = show_progress;

    let runner = SweepRunner::new(exec, subjects).with_cancellation(cancel.clone());
    let outcome = runner.run(&configurations)?;

    let results = compute_statistics(&outcome.samples, &outcome.completed, config.runner.drop);
    let plan = AnalysisPlan::from_config(config, &labels);
    let analysis = analyze(&results, &plan);

    let report_config = ReportConfig {
        sweep: config.sweep,
        repetitions: config.runner.repetitions,
        drop: config.runner.drop,
        operations: config.runner.operations.clone(),
        subjects: labels,
        baseline: plan.baseline.clone(),
        jobs: config.runner.jobs,
        timeout_ms: config.timeout_ns()? / 1_000_000,
        failure_policy: config.runner.failure_policy.to_string(),
        store: config.runner.store.to_string(),
    };
    Ok(build_report(outcome, results, analysis, report_config))
}

fn run_from_cli(cli: &Cli) -> anyhow::Result<RunStatus> {
    let config = load_config(cli)?;
    let format: OutputFormat = config.output.format.parse().unwrap_or_else(|e| {
        tracing::warn!("{}; using human output", e);
        OutputFormat::Human
    });

    let subjects = process_subjects(&config)?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);

    let report = execute_sweep(&config, subjects, &cancel, !cli.no_progress)?;

    // Files first, so a failing run still leaves its partial report behind.
    let dir = PathBuf::from(&config.output.directory);
    let written = write_report_files(&report, &dir, config.output.csv)
        .with_context(|| format!("writing reports to {}", dir.display()))?;
    for path in &written {
        info!("wrote {}", path.display());
    }

    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Csv => generate_csv_report(&report),
        OutputFormat::Human => format_human_output(&report),
    };
    print!("{}", output);

    let status = RunStatus::of(&report);
    match status {
        RunStatus::Success => {}
        RunStatus::TrialsFailed => eprintln!(
            "\n{} trial(s) failed; see {}",
            report.summary.failed_trials,
            dir.display()
        ),
        RunStatus::Aborted => eprintln!(
            "\nSweep aborted: {} failed trial(s); partial report in {}",
            report.summary.failed_trials,
            dir.display()
        ),
        RunStatus::Cancelled => {
            eprintln!("\nSweep cancelled; partial report in {}", dir.display())
        }
    }
    Ok(status)
}

/// Describe what a run would do
fn format_plan(config: &SweepConfig) -> anyhow::Result<String> {
    let configurations = config.sweep.configurations()?;
    let mut out = String::new();

    out.push_str("Sweep plan\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    let values: Vec<String> = configurations.iter().map(|c| c.to_string()).collect();
    out.push_str(&format!("  configurations ({}): {}\n", values.len(), values.join(", ")));
    out.push_str(&format!(
        "  repetitions: {}  drop: {}  jobs: {}  timeout: {}\n",
        config.runner.repetitions, config.runner.drop, config.runner.jobs, config.runner.timeout
    ));
    let ops: Vec<&str> = config.runner.operations.iter().map(|o| o.as_str()).collect();
    out.push_str(&format!("  operations: {}\n", ops.join(", ")));
    out.push_str(&format!(
        "  failure policy: {}  store: {}\n",
        config.runner.failure_policy, config.runner.store
    ));

    out.push_str("\nSubjects\n");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    let baseline = config.baseline();
    for subject in &config.subjects {
        let marker = if Some(subject.label.as_str()) == baseline {
            " (baseline)"
        } else {
            ""
        };
        out.push_str(&format!(
            "  {}{}: {} {}\n",
            subject.label,
            marker,
            subject.program.display(),
            subject.args.join(" ")
        ));
        for (key, value) in &subject.env {
            out.push_str(&format!("      {}={}\n", key, value));
        }
    }

    let trials = configurations.len() * config.subjects.len() * config.runner.repetitions;
    out.push_str(&format!("\n  {} trial(s) in total\n", trials));
    Ok(out)
}
