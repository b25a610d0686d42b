use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("revision unavailable: {0}")]
    RevisionUnavailable(String),

    #[error("benchmark '{name}' failed: {reason}")]
    BenchmarkExecutionFailed { name: String, reason: String },

    #[error("benchmark '{name}' timed out after {seconds}s")]
    BenchmarkTimedOut { name: String, seconds: u64 },

    #[error("benchmark '{name}' produced no '{marker}' timing line")]
    TimingUnavailable { name: String, marker: String },

    #[error("failed to append to {}: {source}", path.display())]
    LogWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("benchmark directory not found: {}", .0.display())]
    BenchmarksDirMissing(PathBuf),

    #[error("unknown benchmark: {0}")]
    UnknownBenchmark(String),

    #[error("invalid record line '{0}'")]
    InvalidRecord(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("interrupted")]
    Interrupted,

    #[error("run stopped after '{0}' failed (fail_fast)")]
    StoppedAfterFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl BenchError {
    /// Errors that end the whole run rather than a single benchmark.
    pub fn is_run_level(&self) -> bool {
        matches!(
            self,
            BenchError::RevisionUnavailable(_)
                | BenchError::Interrupted
                | BenchError::StoppedAfterFailure(_)
                | BenchError::BenchmarksDirMissing(_)
                | BenchError::UnknownBenchmark(_)
                | BenchError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
