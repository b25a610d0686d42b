use anyhow::Context;
use benchrec_core::{
    cancel::CancelToken,
    config::{Config, FailurePolicy},
    runner::{Outcome, RunReport, Runner},
    BenchError,
};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::output::{print_json, print_table};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Project root containing benchmarks/ (overrides --root; use --root for a
    /// directory named like a subcommand)
    pub dir: Option<PathBuf>,

    /// Kill a benchmark after this many seconds (0 = never)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Stop the run at the first failing benchmark
    #[arg(long)]
    pub fail_fast: bool,

    /// Query the working-copy revision once instead of per benchmark
    #[arg(long)]
    pub cache_revision: bool,

    /// Interpreter used to run each benchmark script
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Run only the named benchmark (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Print the commands that would run, without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Layer command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(secs) = self.timeout {
            config.timeout_seconds = secs;
        }
        if self.fail_fast {
            config.failure_policy = FailurePolicy::FailFast;
        }
        if self.cache_revision {
            config.cache_revision = true;
        }
        if let Some(interp) = &self.interpreter {
            config.interpreter = Some(interp.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// RunExit: typed non-zero exit codes, so command code never calls std::process::exit
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RunExit {
    Aborted(String),
    Interrupted,
}

impl RunExit {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunExit::Aborted(_) => 1,
            RunExit::Interrupted => 130,
        }
    }
}

impl std::fmt::Display for RunExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunExit::Aborted(reason) => write!(f, "run aborted: {reason}"),
            RunExit::Interrupted => write!(f, "run interrupted"),
        }
    }
}

impl std::error::Error for RunExit {}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(root: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    args.apply(&mut config);

    let cancel = CancelToken::new();
    let runner = Runner::from_config(root, config, cancel.clone())
        .context("invalid benchmark configuration")?
        .only(args.only);

    if args.dry_run {
        return dry_run(&runner, json);
    }

    // Keep the runtime alive for the whole run so Ctrl-C stays trapped.
    let _signals = watch_for_interrupt(cancel)?;

    let report = runner
        .run()
        .with_context(|| format!("cannot run benchmarks in {}", root.display()))?;

    print_report(&report, json)?;

    match &report.aborted {
        None => Ok(()),
        Some(BenchError::Interrupted) => Err(RunExit::Interrupted.into()),
        Some(e) => Err(RunExit::Aborted(e.to_string()).into()),
    }
}

/// Trap SIGINT on a background runtime and turn it into a cancellation.
/// The handler is installed before this returns.
#[cfg(unix)]
fn watch_for_interrupt(cancel: CancelToken) -> anyhow::Result<tokio::runtime::Runtime> {
    use tokio::signal::unix::{signal, SignalKind};

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to start signal handler")?;
    let mut sigint = {
        let _guard = rt.enter();
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?
    };
    rt.spawn(async move {
        if sigint.recv().await.is_some() {
            tracing::warn!("interrupt received, stopping the running benchmark");
            cancel.cancel();
        }
    });
    Ok(rt)
}

#[cfg(not(unix))]
fn watch_for_interrupt(cancel: CancelToken) -> anyhow::Result<tokio::runtime::Runtime> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to start signal handler")?;
    let mut ctrl_c = {
        let _guard = rt.enter();
        tokio::signal::windows::ctrl_c().context("failed to install Ctrl-C handler")?
    };
    rt.spawn(async move {
        if ctrl_c.recv().await.is_some() {
            tracing::warn!("interrupt received, stopping the running benchmark");
            cancel.cancel();
        }
    });
    Ok(rt)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PlannedRun {
    name: String,
    command: String,
}

fn dry_run(runner: &Runner, json: bool) -> anyhow::Result<()> {
    let plan = runner.plan()?;
    if json {
        let planned: Vec<PlannedRun> = plan
            .iter()
            .map(|inv| PlannedRun {
                name: inv.name.clone(),
                command: inv.display(),
            })
            .collect();
        return print_json(&planned);
    }
    if plan.is_empty() {
        println!("No benchmarks found in {}", runner.benchmarks_dir().display());
    }
    for inv in &plan {
        println!("{}: {}", inv.name, inv.display());
    }
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&report.to_summary());
    }

    if !report.outcomes.is_empty() {
        let rows: Vec<Vec<String>> = report
            .outcomes
            .iter()
            .map(|o| match &o.outcome {
                Outcome::Recorded(r) => vec![
                    o.name.clone(),
                    "recorded".to_string(),
                    r.revision.to_string(),
                    r.elapsed.to_string(),
                ],
                Outcome::Failed(e) => {
                    vec![o.name.clone(), "failed".to_string(), String::new(), e.to_string()]
                }
            })
            .collect();
        print_table(&["BENCHMARK", "STATUS", "REVISION", "ELAPSED"], &rows);
        println!();
    }
    println!("{}", report.summary_line());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let mut config = Config::default();
        let args = RunArgs {
            timeout: Some(5),
            fail_fast: true,
            cache_revision: true,
            interpreter: Some("pypy3".to_string()),
            ..RunArgs::default()
        };
        args.apply(&mut config);
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert!(config.cache_revision);
        assert_eq!(config.interpreter.as_deref(), Some("pypy3"));
    }

    #[test]
    fn no_overrides_keep_config() {
        let mut config = Config::default();
        RunArgs::default().apply(&mut config);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(RunExit::Interrupted.exit_code(), 130);
        assert_eq!(RunExit::Aborted("x".into()).exit_code(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn sigint_right_after_setup_cancels() {
        let cancel = CancelToken::new();
        let _rt = watch_for_interrupt(cancel.clone()).unwrap();

        let status = std::process::Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !cancel.is_cancelled() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(cancel.is_cancelled());
    }
}
