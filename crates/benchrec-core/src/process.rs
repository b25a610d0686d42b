//! Blocking subprocess execution with a deadline and cancellation.
//!
//! Stdout and stderr are drained on dedicated threads so a chatty child can't
//! fill a pipe buffer and stall. A waiter thread reports the exit status over
//! a channel; the caller polls it so that a timeout or an interrupt can kill
//! the child's whole process group.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How a supervised child ended.
#[derive(Debug)]
pub enum Waited {
    Exited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    TimedOut(Duration),
    Interrupted,
}

/// Run `cmd` to completion, killing it if `timeout` elapses or `cancel` fires.
///
/// The child's stdout is captured only when `capture_stdout` is set and is
/// otherwise discarded. Stderr is always captured.
pub fn run_supervised(
    mut cmd: Command,
    capture_stdout: bool,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> std::io::Result<Waited> {
    cmd.stdin(Stdio::null())
        .stdout(if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn()?;
    let pid = child.id();
    let stdout_thread = drain(child.stdout.take());
    let stderr_thread = drain(child.stderr.take());

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(wait(child));
    });

    let started = Instant::now();
    let status = loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(result) => break result?,
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    kill_group(pid);
                    let _ = rx.recv_timeout(Duration::from_secs(1));
                    return Ok(Waited::Interrupted);
                }
                if let Some(limit) = timeout {
                    if started.elapsed() >= limit {
                        kill_group(pid);
                        let _ = rx.recv_timeout(Duration::from_secs(1));
                        return Ok(Waited::TimedOut(limit));
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(std::io::Error::other("child waiter thread exited early"));
            }
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();
    Ok(Waited::Exited {
        status,
        stdout,
        stderr,
    })
}

fn wait(mut child: Child) -> std::io::Result<ExitStatus> {
    child.wait()
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = pipe {
            let _ = r.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// SIGKILL the process group led by `pid`. Best-effort; errors are ignored.
fn kill_group(pid: u32) {
    tracing::debug!(pid, "killing child process group");
    let _ = Command::new("kill")
        .args(["-9", "--", &format!("-{pid}")])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_both_streams() {
        let waited = run_supervised(
            sh("echo out; echo err >&2"),
            true,
            None,
            &CancelToken::new(),
        )
        .unwrap();
        match waited {
            Waited::Exited {
                status,
                stdout,
                stderr,
            } => {
                assert!(status.success());
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "err");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn stdout_discarded_unless_requested() {
        let waited = run_supervised(sh("echo out"), false, None, &CancelToken::new()).unwrap();
        assert!(matches!(waited, Waited::Exited { ref stdout, .. } if stdout.is_empty()));
    }

    #[test]
    fn reports_non_zero_exit() {
        let waited = run_supervised(sh("exit 3"), false, None, &CancelToken::new()).unwrap();
        assert!(matches!(waited, Waited::Exited { status, .. } if status.code() == Some(3)));
    }

    #[test]
    fn timeout_kills_child() {
        let started = Instant::now();
        let waited = run_supervised(
            sh("sleep 60"),
            false,
            Some(Duration::from_millis(150)),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(matches!(waited, Waited::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn cancelled_token_interrupts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let waited = run_supervised(sh("sleep 60"), false, None, &cancel).unwrap();
        assert!(matches!(waited, Waited::Interrupted));
    }

    #[test]
    fn spawn_failure_is_io_error() {
        let cmd = Command::new("/definitely/not/a/program");
        assert!(run_supervised(cmd, false, None, &CancelToken::new()).is_err());
    }
}
