//! Working-copy revision lookup.
//!
//! The version-control tool is an external collaborator. Its status output is
//! scanned for a line such as
//!
//! ```text
//! Working copy : kxqvpsro 1a2b3c4d (no description set)
//! ```
//!
//! and the first two whitespace-delimited fields after the colon become the
//! [`RevisionToken`].

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;

use crate::cancel::CancelToken;
use crate::config::RevisionConfig;
use crate::error::{BenchError, Result};
use crate::process::{self, Waited};
use crate::record::RevisionToken;

pub trait RevisionProvider {
    fn current_revision(&self) -> Result<RevisionToken>;
}

/// Pattern matching `marker`, optional text up to a colon, then the fields.
pub fn marker_pattern(marker: &str) -> Result<Regex> {
    Regex::new(&format!(r"{}[^:\n]*:(.*)", regex::escape(marker)))
        .map_err(|e| BenchError::InvalidConfig(format!("revision.marker '{marker}': {e}")))
}

/// Extract the revision from `output`. The first line matching `pattern`
/// with at least two fields after the colon wins.
pub fn parse_revision(output: &str, pattern: &Regex) -> Option<RevisionToken> {
    output.lines().find_map(|line| {
        let rest = pattern.captures(line)?.get(1)?.as_str();
        let fields: Vec<&str> = rest.split_whitespace().take(2).collect();
        if fields.len() < 2 {
            return None;
        }
        RevisionToken::from_fields(fields)
    })
}

// ---------------------------------------------------------------------------
// CommandRevisionProvider
// ---------------------------------------------------------------------------

/// Runs the configured status command in the project root.
pub struct CommandRevisionProvider {
    program: String,
    args: Vec<String>,
    marker: String,
    pattern: Regex,
    cwd: PathBuf,
    cancel: CancelToken,
}

impl CommandRevisionProvider {
    pub fn new(config: &RevisionConfig, cwd: &Path, cancel: CancelToken) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| BenchError::InvalidConfig("revision.command is empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            marker: config.marker.clone(),
            pattern: marker_pattern(&config.marker)?,
            cwd: cwd.to_path_buf(),
            cancel,
        })
    }
}

impl RevisionProvider for CommandRevisionProvider {
    fn current_revision(&self) -> Result<RevisionToken> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.cwd);

        let waited = process::run_supervised(cmd, true, None, &self.cancel).map_err(|e| {
            BenchError::RevisionUnavailable(format!("failed to run '{}': {e}", self.program))
        })?;

        let (status, stdout) = match waited {
            Waited::Exited { status, stdout, .. } => (status, stdout),
            Waited::Interrupted => return Err(BenchError::Interrupted),
            Waited::TimedOut(_) => {
                return Err(BenchError::RevisionUnavailable(format!(
                    "'{}' timed out",
                    self.program
                )))
            }
        };

        if !status.success() {
            tracing::debug!(program = %self.program, %status, "revision command exited non-zero");
        }

        let token = parse_revision(&stdout, &self.pattern).ok_or_else(|| {
            BenchError::RevisionUnavailable(format!(
                "no '{}:' line in output of '{}'",
                self.marker, self.program
            ))
        })?;
        tracing::debug!(revision = %token, "resolved working-copy revision");
        Ok(token)
    }
}
