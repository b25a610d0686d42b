//! Timing benchmark children through an external timing facility.
//!
//! The facility wraps the benchmark command (by default bash's `time`
//! keyword) and reports CPU usage on stderr, e.g.
//!
//! ```text
//! real    0m0.530s
//! user    0m0.512s
//! sys     0m0.012s
//! ```
//!
//! The last whitespace-delimited field of the marker line is kept verbatim.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::{Config, TimerConfig};
use crate::discovery::BenchmarkDefinition;
use crate::error::{BenchError, Result};
use crate::process::{self, Waited};
use crate::record::Elapsed;

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// A fully resolved benchmark command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    /// `<interpreter> <interpreter_args..> <script>`, or the script alone
    /// when no interpreter is configured.
    pub fn for_benchmark(def: &BenchmarkDefinition, config: &Config, cwd: &Path) -> Self {
        let script = def.script.to_string_lossy().into_owned();
        let (program, args) = match &config.interpreter {
            Some(interp) => {
                let mut args = config.interpreter_args.clone();
                args.push(script);
                (interp.clone(), args)
            }
            None => (script, Vec::new()),
        };
        Self {
            name: def.name.clone(),
            program,
            args,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    pub fn display(&self) -> String {
        self.argv().join(" ")
    }
}

// ---------------------------------------------------------------------------
// ProcessTimer
// ---------------------------------------------------------------------------

pub trait ProcessTimer {
    /// Run `invocation` to completion and return its user CPU time.
    fn time(&self, invocation: &Invocation) -> Result<Elapsed>;
}

/// Take the last field of the last line whose first field is `marker`.
pub fn parse_elapsed(output: &str, marker: &str) -> Option<Elapsed> {
    output
        .lines()
        .filter(|line| line.split_whitespace().next() == Some(marker))
        .filter_map(|line| line.split_whitespace().last())
        .filter(|field| *field != marker)
        .last()
        .map(Elapsed::new)
}

/// Wraps each benchmark in the configured timing command.
pub struct CommandTimer {
    wrapper: Vec<String>,
    marker: String,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl CommandTimer {
    pub fn new(config: &TimerConfig, timeout: Option<Duration>, cancel: CancelToken) -> Result<Self> {
        if config.command.is_empty() {
            return Err(BenchError::InvalidConfig("timer.command is empty".into()));
        }
        Ok(Self {
            wrapper: config.command.clone(),
            marker: config.marker.clone(),
            timeout,
            cancel,
        })
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.wrapper[0]);
        cmd.args(&self.wrapper[1..])
            .args(invocation.argv())
            .current_dir(&invocation.cwd);
        cmd
    }
}

impl ProcessTimer for CommandTimer {
    fn time(&self, invocation: &Invocation) -> Result<Elapsed> {
        let cmd = self.command(invocation);
        tracing::debug!(benchmark = %invocation.name, command = %invocation.display(), "executing");

        let waited = process::run_supervised(cmd, false, self.timeout, &self.cancel).map_err(
            |source| BenchError::SpawnFailed {
                program: self.wrapper[0].clone(),
                source,
            },
        )?;

        let (status, stderr) = match waited {
            Waited::Exited { status, stderr, .. } => (status, stderr),
            Waited::Interrupted => return Err(BenchError::Interrupted),
            Waited::TimedOut(limit) => {
                return Err(BenchError::BenchmarkTimedOut {
                    name: invocation.name.clone(),
                    seconds: limit.as_secs(),
                })
            }
        };

        if !status.success() {
            let reason = match status.code() {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            };
            let tail = stderr_tail(&stderr, &self.marker);
            return Err(BenchError::BenchmarkExecutionFailed {
                name: invocation.name.clone(),
                reason: if tail.is_empty() {
                    reason
                } else {
                    format!("{reason}: {tail}")
                },
            });
        }

        parse_elapsed(&stderr, &self.marker).ok_or_else(|| BenchError::TimingUnavailable {
            name: invocation.name.clone(),
            marker: self.marker.clone(),
        })
    }
}

/// Last non-timing stderr line, to give failures some context.
fn stderr_tail(stderr: &str, marker: &str) -> String {
    const TIMING_FIELDS: [&str; 2] = ["real", "sys"];
    stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| {
            let first = l.split_whitespace().next().unwrap_or("");
            first != marker && !TIMING_FIELDS.contains(&first)
        })
        .last()
        .unwrap_or("")
        .chars()
        .take(200)
        .collect()
}
