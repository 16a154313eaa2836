//! Bounded execution of external processes

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use super::formatter::Invocation;
use crate::error::{AdbError, Result};

/// How long pipe readers may keep draining after the child is gone
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How a process call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Exited on its own with this status code
    Code(i32),
    /// Terminated by a signal the runner did not send
    Signaled,
    /// Killed by the runner after its timeout elapsed
    TimedOut,
}

impl ExitState {
    fn from_status(status: std::process::ExitStatus) -> Self {
        status.code().map(Self::Code).unwrap_or(Self::Signaled)
    }
}

/// Undecoded output of one process call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit: ExitState,
    pub elapsed: Duration,
}

/// Accumulates a pipe into a shared buffer so a kill never loses what was read
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else { return };
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        debug!("pipe read stopped: {}", e);
                        break;
                    }
                }
            }
        });
        Self { buf, task }
    }

    /// Wait for EOF, or give up after `limit` and keep what was captured
    async fn finish(self, limit: Option<Duration>) -> Vec<u8> {
        let Self { buf, mut task } = self;
        match limit {
            None => {
                let _ = (&mut task).await;
            }
            Some(limit) => {
                if time::timeout(limit, &mut task).await.is_err() {
                    debug!("pipe still open after {:?}, abandoning reader", limit);
                    task.abort();
                }
            }
        }
        let mut guard = buf.lock().await;
        std::mem::take(&mut *guard)
    }
}

/// Spawns one OS process per call and enforces the invocation's timeout
///
/// Stdin is not fed. Stdout and stderr are captured separately. A nonzero exit
/// is a normal outcome; only a failure to launch the program is an error.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    drain_grace: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            drain_grace: DRAIN_GRACE,
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override how long readers may drain after exit or kill
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub async fn run(&self, invocation: &Invocation) -> Result<RawOutput> {
        let started = Instant::now();
        let mut child = Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AdbError::Spawn {
                command: invocation.display().to_string(),
                source,
            })?;

        debug!(pid = ?child.id(), command = %invocation, "spawned");

        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        // The timer lives only inside this race; it is dropped as soon as
        // either side finishes.
        let exit = match invocation.timeout() {
            None => ExitState::from_status(child.wait().await?),
            Some(limit) => match time::timeout(limit, child.wait()).await {
                Ok(status) => ExitState::from_status(status?),
                Err(_) => {
                    warn!("`{}` exceeded {:?}, killing", invocation, limit);
                    if let Err(e) = child.kill().await {
                        warn!("kill of `{}` failed: {}", invocation, e);
                    }
                    ExitState::TimedOut
                }
            },
        };

        let drain_limit = match (exit, invocation.timeout()) {
            (_, None) => None,
            (ExitState::TimedOut, Some(_)) => Some(self.drain_grace),
            (_, Some(limit)) => {
                Some(limit.saturating_sub(started.elapsed()) + self.drain_grace)
            }
        };
        let (stdout, stderr) =
            futures::future::join(stdout.finish(drain_limit), stderr.finish(drain_limit)).await;

        let elapsed = started.elapsed();
        debug!(?exit, ?elapsed, "`{}` finished", invocation);

        Ok(RawOutput {
            stdout,
            stderr,
            exit,
            elapsed,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Option<Duration>) -> Invocation {
        Invocation::new("sh", ["-c", script]).with_timeout(timeout)
    }

    #[tokio::test]
    async fn test_run_without_timeout() {
        let output = ProcessRunner::new()
            .run(&sh("printf ok", None))
            .await
            .unwrap();
        assert_eq!(output.stdout, b"ok");
        assert!(output.stderr.is_empty());
        assert_eq!(output.exit, ExitState::Code(0));
    }

    #[tokio::test]
    async fn test_separate_streams_and_nonzero_exit() {
        let output = ProcessRunner::new()
            .run(&sh("echo out; echo err >&2; exit 3", Some(Duration::from_secs(10))))
            .await
            .unwrap();
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr, b"err\n");
        assert_eq!(output.exit, ExitState::Code(3));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let output = ProcessRunner::new()
            .run(&sh(
                "printf partial; exec sleep 30",
                Some(Duration::from_millis(300)),
            ))
            .await
            .unwrap();
        assert_eq!(output.exit, ExitState::TimedOut);
        assert_eq!(output.stdout, b"partial");
        assert!(output.elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_with_grandchild_holding_pipes() {
        // The trailing `:` keeps sh from exec'ing sleep, so sleep outlives the kill
        let started = Instant::now();
        let output = ProcessRunner::new()
            .run(&sh("sleep 30; :", Some(Duration::from_millis(200))))
            .await
            .unwrap();
        assert_eq!(output.exit, ExitState::TimedOut);
        assert!(output.stdout.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let invocation = Invocation::new("/nonexistent/adb-control-test-binary", ["devices"]);
        let err = ProcessRunner::new().run(&invocation).await.unwrap_err();
        match err {
            AdbError::Spawn { command, .. } => {
                assert_eq!(command, "/nonexistent/adb-control-test-binary devices")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stdin_is_not_fed() {
        let output = ProcessRunner::new()
            .run(&sh("cat; echo done", Some(Duration::from_secs(5))))
            .await
            .unwrap();
        assert_eq!(output.stdout, b"done\n");
        assert_eq!(output.exit, ExitState::Code(0));
    }
}
