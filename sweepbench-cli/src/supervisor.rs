//! Process Supervisor
//!
//! Runs external subject programs, one child process per trial. The child
//! gets its scratch store through `SWEEPBENCH_SCRATCH_DIR` and the
//! `{scratch}` / `{config}` argument placeholders. Stdout is parsed for
//! timings; stderr is kept for failure reports.
//!
//! A trial that outlives its timeout is stopped with SIGTERM, given a
//! short grace period, then killed and reaped.

use crate::config::{SubjectConfig, SweepConfig};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use sweepbench_core::{
    FailureCause, Operation, OperationTimings, OutputParser, SCRATCH_DIR_ENV, Subject, Timer,
    TrialRequest,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Time a child gets to exit after SIGTERM before it is killed
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Interval between liveness checks while waiting on a child
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Bytes of stderr kept in failure reports
const STDERR_TAIL: usize = 2048;

/// Errors building a process subject from its configuration
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The output pattern does not compile
    #[error("subject '{label}': invalid output pattern: {source}")]
    InvalidPattern {
        /// Subject label
        label: String,
        /// Regex compilation error
        #[source]
        source: regex::Error,
    },

    /// The per-subject timeout is not a valid duration
    #[error("subject '{label}': {source}")]
    InvalidTimeout {
        /// Subject label
        label: String,
        /// Duration parse error
        #[source]
        source: anyhow::Error,
    },
}

/// Signal the child's whole process group, so shell wrappers take their
/// children down with them.
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> Result<(), std::io::Error> {
    signal_group(child.id(), libc::SIGTERM)
}

#[cfg(unix)]
fn force_kill(child: &mut Child) {
    if signal_group(child.id(), libc::SIGKILL).is_err() {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> Result<(), std::io::Error> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "SIGTERM is not available on this platform",
    ))
}

#[cfg(not(unix))]
fn force_kill(child: &mut Child) {
    let _ = child.kill();
}

/// Subject backed by an external program
#[derive(Debug, Clone)]
pub struct ProcessSubject {
    label: String,
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Duration,
    parser: OutputParser,
}

impl ProcessSubject {
    /// Build from a `[[subjects]]` entry, falling back to `default_timeout`
    pub fn from_config(
        config: &SubjectConfig,
        default_timeout: Duration,
    ) -> Result<Self, SupervisorError> {
        let parser = OutputParser::new(config.output.clone()).map_err(|source| {
            SupervisorError::InvalidPattern {
                label: config.label.clone(),
                source,
            }
        })?;
        let timeout = match &config.timeout {
            Some(t) => Duration::from_nanos(SweepConfig::parse_duration(t).map_err(|source| {
                SupervisorError::InvalidTimeout {
                    label: config.label.clone(),
                    source,
                }
            })?),
            None => default_timeout,
        };

        Ok(Self {
            label: config.label.clone(),
            program: config.program.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            timeout,
            parser,
        })
    }

    /// Per-trial time limit
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, request: &TrialRequest<'_>) -> Command {
        let config = request.configuration.to_string();
        let scratch = request.scratch.to_string_lossy();

        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(|arg| {
                arg.replace("{config}", &config)
                    .replace("{scratch}", &scratch)
            }))
            .envs(&self.env)
            .env(SCRATCH_DIR_ENV, request.scratch)
            .current_dir(request.scratch)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
    }

    /// Wait for the child, enforcing the timeout
    ///
    /// Returns `None` when the child had to be terminated.
    fn wait_with_deadline(&self, child: &mut Child) -> Result<Option<ExitStatus>, FailureCause> {
        self.wait_polling(child, Child::try_wait)
    }

    fn wait_polling(
        &self,
        child: &mut Child,
        mut poll: impl FnMut(&mut Child) -> std::io::Result<Option<ExitStatus>>,
    ) -> Result<Option<ExitStatus>, FailureCause> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match poll(child) {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) => {}
                Err(e) => {
                    // Never leave a running subject behind.
                    self.terminate(child, "could not poll child");
                    return Err(FailureCause::Spawn {
                        message: format!("waiting on child: {e}"),
                    });
                }
            }
            if Instant::now() >= deadline {
                self.terminate(child, "trial timed out");
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// SIGTERM, grace period, then SIGKILL; always reaps the child
    fn terminate(&self, child: &mut Child, reason: &str) {
        warn!(subject = %self.label, pid = child.id(), "{reason}, terminating");
        let _ = send_sigterm(child);

        let grace_deadline = Instant::now() + TERM_GRACE;
        while Instant::now() < grace_deadline {
            if let Ok(Some(_)) = child.try_wait() {
                return;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        debug!(subject = %self.label, "child ignored SIGTERM, killing");
        force_kill(child);
        let _ = child.wait();
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn tail(text: &str, max: usize) -> String {
    let text = text.trim_end();
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

impl Subject for ProcessSubject {
    fn label(&self) -> &str {
        &self.label
    }

    fn run_trial(&self, request: &TrialRequest<'_>) -> Result<OperationTimings, FailureCause> {
        debug!(
            subject = %self.label,
            configuration = %request.configuration,
            repetition = request.repetition,
            "spawning {}",
            self.program.display()
        );

        let timer = Timer::start();
        let mut child = self
            .command(request)
            .spawn()
            .map_err(|e| FailureCause::Spawn {
                message: format!("{}: {e}", self.program.display()),
            })?;

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.wait_with_deadline(&mut child)? {
            Some(status) => status,
            None => {
                // Reader threads are detached; a stray grandchild may still hold the pipes.
                return Err(FailureCause::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };
        let wall_secs = timer.stop().as_secs_f64();
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            return Err(FailureCause::NonZeroExit {
                code: status.code(),
                stderr: tail(&stderr, STDERR_TAIL),
            });
        }

        let mut timings = self.parser.parse(&stdout)?;
        if self.parser.format().is_wall_clock() {
            timings.insert(Operation::total(), wall_secs);
        }
        Ok(timings)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use sweepbench_core::{Configuration, OutputFormat};

    fn shell(label: &str, script: &str, output: OutputFormat) -> ProcessSubject {
        let config = SubjectConfig {
            label: label.to_string(),
            program: "/bin/sh".into(),
            args: vec!["-c".into(), script.into(), "sh".into(), "{config}".into(), "{scratch}".into()],
            env: BTreeMap::from([("BENCH_MODE".to_string(), "variant".to_string())]),
            timeout: Some("2s".into()),
            output,
        };
        ProcessSubject::from_config(&config, Duration::from_secs(60)).unwrap()
    }

    fn run(subject: &ProcessSubject) -> Result<OperationTimings, FailureCause> {
        let ops = vec![Operation::total()];
        let scratch = tempfile::tempdir().unwrap();
        subject.run_trial(&TrialRequest {
            configuration: Configuration(100),
            operations: &ops,
            scratch: scratch.path(),
            repetition: 0,
        })
    }

    #[test]
    fn test_parses_total_line() {
        let subject = shell("s", "echo 'TOTAL.......... 0.125s'", OutputFormat::default());
        let timings = run(&subject).unwrap();
        assert!((timings[&Operation::total()] - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_placeholders_and_env() {
        let script = r#"[ "$1" = 100 ] && [ "$2" = "$SWEEPBENCH_SCRATCH_DIR" ] && [ "$BENCH_MODE" = variant ] && [ "$(pwd -P)" = "$(cd "$2" && pwd -P)" ] && echo '{"total": 1.5}'"#;
        let subject = shell("s", script, OutputFormat::Json);
        let timings = run(&subject).unwrap();
        assert!((timings[&Operation::total()] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_nonzero_exit() {
        let subject = shell("s", "echo oops >&2; exit 3", OutputFormat::default());
        match run(&subject).unwrap_err() {
            FailureCause::NonZeroExit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_output() {
        let subject = shell("s", "echo done", OutputFormat::default());
        assert!(matches!(
            run(&subject).unwrap_err(),
            FailureCause::Unparseable { .. }
        ));
    }

    #[test]
    fn test_timeout_terminates_child() {
        let mut subject = shell("s", "sleep 30", OutputFormat::default());
        subject.timeout = Duration::from_millis(100);
        let started = Instant::now();
        let err = run(&subject).unwrap_err();
        assert_eq!(err, FailureCause::Timeout { timeout_ms: 100 });
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_wall_clock() {
        let subject = shell("s", "sleep 0.05", OutputFormat::WallClock);
        let timings = run(&subject).unwrap();
        assert!(timings[&Operation::total()] >= 0.05);
    }

    #[test]
    fn test_spawn_failure() {
        let mut subject = shell("s", "true", OutputFormat::default());
        subject.program = "/nonexistent/sweepbench-subject".into();
        assert!(matches!(run(&subject).unwrap_err(), FailureCause::Spawn { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let config = SubjectConfig {
            label: "s".into(),
            program: "/bin/true".into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: None,
            output: OutputFormat::Total {
                pattern: Some("(".into()),
            },
        };
        assert!(ProcessSubject::from_config(&config, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("abcdef\n", 3), "def");
        assert_eq!(tail("short", 10), "short");
    }

    #[test]
    fn test_poll_error_reaps_child() {
        let subject = shell("s", "sleep 30", OutputFormat::default());
        let scratch = tempfile::tempdir().unwrap();
        let ops = vec![Operation::total()];
        let mut child = subject
            .command(&TrialRequest {
                configuration: Configuration(1),
                operations: &ops,
                scratch: scratch.path(),
                repetition: 0,
            })
            .spawn()
            .unwrap();

        let started = Instant::now();
        let err = subject
            .wait_polling(&mut child, |_| Err(std::io::Error::other("lost")))
            .unwrap_err();
        assert!(matches!(err, FailureCause::Spawn { message } if message.contains("lost")));
        assert!(child.try_wait().unwrap().is_some());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
