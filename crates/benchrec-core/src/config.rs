use crate::error::{BenchError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// FailurePolicy
// ---------------------------------------------------------------------------

/// What the runner does when a single benchmark fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and move on to the next benchmark.
    #[default]
    Continue,
    /// Abort the run on the first failed benchmark.
    FailFast,
}

// ---------------------------------------------------------------------------
// RevisionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionConfig {
    /// Version-control status command, program first.
    #[serde(default = "default_revision_command")]
    pub command: Vec<String>,
    /// Line marker preceding the `:` that introduces the revision fields.
    #[serde(default = "default_revision_marker")]
    pub marker: String,
}

fn default_revision_command() -> Vec<String> {
    vec!["jj".to_string(), "status".to_string()]
}

fn default_revision_marker() -> String {
    "Working copy".to_string()
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            command: default_revision_command(),
            marker: default_revision_marker(),
        }
    }
}

// ---------------------------------------------------------------------------
// TimerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Timing wrapper; the benchmark invocation is appended as trailing args.
    #[serde(default = "default_timer_command")]
    pub command: Vec<String>,
    /// First token of the stderr line carrying user CPU time.
    #[serde(default = "default_timer_marker")]
    pub marker: String,
}

fn default_timer_command() -> Vec<String> {
    vec![
        "bash".to_string(),
        "-c".to_string(),
        "time \"$@\"".to_string(),
        "--".to_string(),
    ]
}

fn default_timer_marker() -> String {
    "user".to_string()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            command: default_timer_command(),
            marker: default_timer_marker(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_benchmarks_dir")]
    pub benchmarks_dir: PathBuf,
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    /// `None` runs each benchmark script directly.
    #[serde(default = "default_interpreter")]
    pub interpreter: Option<String>,
    #[serde(default = "default_interpreter_args")]
    pub interpreter_args: Vec<String>,
    #[serde(default)]
    pub revision: RevisionConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    /// Per-benchmark timeout; `0` waits indefinitely.
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Query the revision once per run instead of once per benchmark.
    #[serde(default)]
    pub cache_revision: bool,
}

fn default_benchmarks_dir() -> PathBuf {
    PathBuf::from(paths::BENCHMARKS_DIR)
}

fn default_source_extension() -> String {
    "py".to_string()
}

fn default_interpreter() -> Option<String> {
    Some("python3".to_string())
}

fn default_interpreter_args() -> Vec<String> {
    vec!["-O".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            benchmarks_dir: default_benchmarks_dir(),
            source_extension: default_source_extension(),
            interpreter: default_interpreter(),
            interpreter_args: default_interpreter_args(),
            revision: RevisionConfig::default(),
            timer: TimerConfig::default(),
            timeout_seconds: 0,
            failure_policy: FailurePolicy::default(),
            cache_revision: false,
        }
    }
}

impl Config {
    /// Load `benchrec.yaml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            0 => None,
            s => Some(Duration::from_secs(s)),
        }
    }

    pub fn benchmarks_path(&self, root: &Path) -> PathBuf {
        paths::benchmarks_dir(root, &self.benchmarks_dir)
    }

    /// Fail with `InvalidConfig` if `validate` reports any error.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BenchError::InvalidConfig(errors.join("; ")))
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let ext = self.source_extension.trim();
        if ext.is_empty() {
            warnings.push(error("source_extension is empty"));
        } else if ext.contains('.') {
            warnings.push(error(format!(
                "source_extension '{ext}' must not contain a dot"
            )));
        } else if ext == paths::LOG_EXTENSION {
            warnings.push(error(format!(
                "source_extension '{ext}' collides with the result log extension"
            )));
        }

        if self.revision.command.is_empty() {
            warnings.push(error("revision.command is empty"));
        }
        if self.revision.marker.trim().is_empty() {
            warnings.push(error("revision.marker is empty"));
        }
        if self.timer.command.is_empty() {
            warnings.push(error("timer.command is empty"));
        }
        if self.timer.marker.trim().is_empty() {
            warnings.push(error("timer.marker is empty"));
        }

        // Missing programs only warn.
        let programs = [
            ("interpreter", self.interpreter.as_deref()),
            ("revision.command", self.revision.command.first().map(String::as_str)),
            ("timer.command", self.timer.command.first().map(String::as_str)),
        ];
        for (field, program) in programs {
            if let Some(program) = program {
                if which::which(program).is_err() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!("{field}: '{program}' not found on PATH"),
                    });
                }
            }
        }

        if self.timeout_seconds > 24 * 60 * 60 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "timeout_seconds={} (more than a day is unusual)",
                    self.timeout_seconds
                ),
            });
        }

        warnings
    }
}

fn error(message: impl Into<String>) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Error,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.source_extension, "py");
        assert_eq!(cfg.interpreter.as_deref(), Some("python3"));
        assert_eq!(cfg.timeout(), None);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("benchrec.yaml"),
            "timeout_seconds: 30\nfailure_policy: fail_fast\nrevision:\n  marker: Parent\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.failure_policy, FailurePolicy::FailFast);
        assert_eq!(cfg.revision.marker, "Parent");
        assert_eq!(cfg.revision.command, vec!["jj", "status"]);
        assert_eq!(cfg.timer.marker, "user");
    }

    #[test]
    fn quoted_command_with_colon_stays_a_string() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("benchrec.yaml"),
            "revision:\n  command:\n    - sh\n    - '-c'\n    - 'echo \"Working copy : abc 4\"'\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.revision.command[2], "echo \"Working copy : abc 4\"");
    }

    #[test]
    fn null_interpreter_runs_scripts_directly() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("benchrec.yaml"), "interpreter: null\n").unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.interpreter, None);
    }

    #[test]
    fn bad_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("benchrec.yaml"), "timeout_seconds: [").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(BenchError::Yaml(_))
        ));
    }

    #[test]
    fn extension_colliding_with_log_is_error() {
        let cfg = Config {
            source_extension: "benchmark".to_string(),
            ..Config::default()
        };
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("collides")));
        assert!(matches!(
            cfg.ensure_valid(),
            Err(BenchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_commands_are_errors() {
        let cfg = Config {
            revision: RevisionConfig {
                command: vec![],
                marker: "Working copy".to_string(),
            },
            timer: TimerConfig {
                command: vec![],
                marker: "user".to_string(),
            },
            ..Config::default()
        };
        let errors: Vec<_> = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .collect();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn missing_program_is_only_a_warning() {
        let cfg = Config {
            interpreter: Some("definitely-not-a-real-interpreter-xyz".to_string()),
            ..Config::default()
        };
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Warning
            && w.message.contains("definitely-not-a-real-interpreter-xyz")));
        assert!(cfg.ensure_valid().is_ok());
    }

    #[test]
    fn config_yaml_roundtrip() {
        let cfg = Config {
            timeout_seconds: 5,
            cache_revision: true,
            ..Config::default()
        };
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(yaml.contains("failure_policy: continue"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }
}
