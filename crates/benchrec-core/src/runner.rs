//! The benchmark run loop.
//!
//! Benchmarks run strictly one after another: timestamp, revision lookup,
//! timed execution, then a single-line append to `<name>.benchmark`. Per-item
//! failures are collected into the [`RunReport`]; run-level failures stop the
//! loop and are reported as `aborted`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::cancel::CancelToken;
use crate::config::{Config, FailurePolicy};
use crate::discovery::{self, BenchmarkDefinition};
use crate::error::{BenchError, Result};
use crate::io;
use crate::record::{self, Record, RevisionToken};
use crate::revision::{CommandRevisionProvider, RevisionProvider};
use crate::timer::{CommandTimer, Invocation, ProcessTimer};

const LOG_RETRY_DELAY: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Outcome {
    Recorded(Record),
    Failed(BenchError),
}

#[derive(Debug)]
pub struct BenchmarkOutcome {
    pub name: String,
    pub log: PathBuf,
    pub outcome: Outcome,
}

impl BenchmarkOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self.outcome, Outcome::Recorded(_))
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub discovered: usize,
    pub outcomes: Vec<BenchmarkOutcome>,
    /// Set when a run-level error ended the loop early.
    pub aborted: Option<BenchError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.aborted.is_none()
    }

    pub fn recorded(&self) -> impl Iterator<Item = &BenchmarkOutcome> {
        self.outcomes.iter().filter(|o| o.is_recorded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BenchmarkOutcome> {
        self.outcomes.iter().filter(|o| !o.is_recorded())
    }

    /// `recorded: a, b; failed: c (reason)`
    pub fn summary_line(&self) -> String {
        let recorded: Vec<&str> = self.recorded().map(|o| o.name.as_str()).collect();
        let failed: Vec<String> = self
            .failed()
            .map(|o| match &o.outcome {
                Outcome::Failed(e) => format!("{} ({e})", o.name),
                Outcome::Recorded(_) => o.name.clone(),
            })
            .collect();
        let mut line = format!(
            "recorded {}/{}: {}",
            recorded.len(),
            self.discovered,
            if recorded.is_empty() {
                "-".to_string()
            } else {
                recorded.join(", ")
            }
        );
        if !failed.is_empty() {
            line.push_str(&format!("; failed: {}", failed.join(", ")));
        }
        if let Some(e) = &self.aborted {
            line.push_str(&format!("; aborted: {e}"));
        }
        line
    }

    pub fn to_summary(&self) -> RunSummary {
        RunSummary {
            discovered: self.discovered,
            recorded: self
                .outcomes
                .iter()
                .filter_map(|o| match &o.outcome {
                    Outcome::Recorded(r) => Some(RecordedEntry {
                        name: o.name.clone(),
                        log: o.log.clone(),
                        record: r.clone(),
                    }),
                    Outcome::Failed(_) => None,
                })
                .collect(),
            failed: self
                .outcomes
                .iter()
                .filter_map(|o| match &o.outcome {
                    Outcome::Failed(e) => Some(FailedEntry {
                        name: o.name.clone(),
                        error: e.to_string(),
                    }),
                    Outcome::Recorded(_) => None,
                })
                .collect(),
            aborted: self.aborted.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Serializable view of a [`RunReport`].
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub discovered: usize,
    pub recorded: Vec<RecordedEntry>,
    pub failed: Vec<FailedEntry>,
    pub aborted: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordedEntry {
    pub name: String,
    pub log: PathBuf,
    pub record: Record,
}

#[derive(Debug, Serialize)]
pub struct FailedEntry {
    pub name: String,
    pub error: String,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct Runner {
    root: PathBuf,
    config: Config,
    revisions: Box<dyn RevisionProvider>,
    timer: Box<dyn ProcessTimer>,
    cancel: CancelToken,
    only: Vec<String>,
}

impl Runner {
    pub fn new(
        root: &Path,
        config: Config,
        revisions: Box<dyn RevisionProvider>,
        timer: Box<dyn ProcessTimer>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            revisions,
            timer,
            cancel,
            only: Vec::new(),
        }
    }

    /// Wire up the command-backed revision provider and timer from `config`.
    pub fn from_config(root: &Path, config: Config, cancel: CancelToken) -> Result<Self> {
        config.ensure_valid()?;
        let revisions = CommandRevisionProvider::new(&config.revision, root, cancel.clone())?;
        let timer = CommandTimer::new(&config.timer, config.timeout(), cancel.clone())?;
        Ok(Self::new(
            root,
            config,
            Box::new(revisions),
            Box::new(timer),
            cancel,
        ))
    }

    /// Restrict the run to the named benchmarks.
    pub fn only(mut self, names: Vec<String>) -> Self {
        self.only = names;
        self
    }

    pub fn benchmarks_dir(&self) -> PathBuf {
        self.config.benchmarks_path(&self.root)
    }

    pub fn discover(&self) -> Result<Vec<BenchmarkDefinition>> {
        let all = discovery::discover(&self.benchmarks_dir(), &self.config.source_extension)?;
        discovery::select(all, &self.only)
    }

    /// The commands a run would execute, without executing them.
    pub fn plan(&self) -> Result<Vec<Invocation>> {
        Ok(self
            .discover()?
            .iter()
            .map(|def| Invocation::for_benchmark(def, &self.config, &self.root))
            .collect())
    }

    /// Run every discovered benchmark in order.
    ///
    /// Errors only if discovery fails; everything after that is reported in
    /// the returned [`RunReport`].
    pub fn run(&self) -> Result<RunReport> {
        let definitions = self.discover()?;
        let mut report = RunReport {
            discovered: definitions.len(),
            ..RunReport::default()
        };
        let mut cached_revision = None;

        for def in definitions {
            if self.cancel.is_cancelled() {
                report.aborted = Some(BenchError::Interrupted);
                break;
            }

            let log = def.log_path();
            match self.run_one(&def, &log, &mut cached_revision) {
                Ok(record) => {
                    tracing::info!(benchmark = %def.name, record = %record, "recorded");
                    report.outcomes.push(BenchmarkOutcome {
                        name: def.name,
                        log,
                        outcome: Outcome::Recorded(record),
                    });
                }
                Err(e) if e.is_run_level() => {
                    tracing::error!(benchmark = %def.name, error = %e, "aborting run");
                    report.aborted = Some(e);
                    break;
                }
                Err(e) => {
                    tracing::warn!(benchmark = %def.name, error = %e, "benchmark failed");
                    let name = def.name.clone();
                    report.outcomes.push(BenchmarkOutcome {
                        name: def.name,
                        log,
                        outcome: Outcome::Failed(e),
                    });
                    if self.config.failure_policy == FailurePolicy::FailFast {
                        report.aborted = Some(BenchError::StoppedAfterFailure(name));
                        break;
                    }
                }
            }
        }

        Ok(report)
    }

    fn run_one(
        &self,
        def: &BenchmarkDefinition,
        log: &Path,
        cached_revision: &mut Option<RevisionToken>,
    ) -> Result<Record> {
        let timestamp = record::now_timestamp();
        let revision = self.revision(cached_revision)?;
        let invocation = Invocation::for_benchmark(def, &self.config, &self.root);
        let elapsed = self.timer.time(&invocation)?;
        let record = Record::new(timestamp, revision, elapsed);
        append_with_retry(log, &record.to_line())?;
        Ok(record)
    }

    fn revision(&self, cached: &mut Option<RevisionToken>) -> Result<RevisionToken> {
        if self.config.cache_revision {
            if let Some(rev) = cached {
                return Ok(rev.clone());
            }
        }
        let rev = self.revisions.current_revision()?;
        if self.config.cache_revision {
            *cached = Some(rev.clone());
        }
        Ok(rev)
    }
}

/// Append `line`, retrying once before giving up with `LogWriteFailed`.
fn append_with_retry(log: &Path, line: &str) -> Result<()> {
    match io::append_line(log, line) {
        Ok(()) => return Ok(()),
        Err(e) => {
            tracing::warn!(log = %log.display(), error = %e, "append failed, retrying once");
        }
    }
    std::thread::sleep(LOG_RETRY_DELAY);
    io::append_line(log, line).map_err(|e| match e {
        BenchError::Io(source) => BenchError::LogWriteFailed {
            path: log.to_path_buf(),
            source,
        },
        other => other,
    })
}
