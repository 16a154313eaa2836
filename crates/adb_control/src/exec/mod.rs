//! Bounded command execution
//!
//! This module provides:
//! - `formatter`: Direct and shell-wrapped adb invocations
//! - `runner`: Process spawning with timeout and kill
//! - `decoder`: Byte-to-text decoding with encoding fallback

mod decoder;
mod formatter;
mod runner;

pub use decoder::{DecodeError, ExecutionResult, OutputDecoder};
pub use formatter::{CommandFormatter, Invocation};
pub use runner::{ExitState, ProcessRunner, RawOutput};

use std::time::Duration;

use crate::error::{AdbError, Result};

/// Run a full command line with a timeout and return its text
///
/// The line is split with POSIX shell quoting rules and executed without a
/// host shell. Output is decoded as UTF-8 and follows the stdout-or-stderr
/// convention. Pass [`DEFAULT_BOUNDED_TIMEOUT`](crate::config::DEFAULT_BOUNDED_TIMEOUT)
/// for the usual 20 second bound.
pub async fn run_command_line(line: &str, timeout: Duration) -> Result<String> {
    let invocation = Invocation::parse(line)?.with_timeout(Some(timeout));
    let raw = ProcessRunner::new().run(&invocation).await?;
    OutputDecoder::default()
        .decode_text(&raw)
        .map_err(|source| AdbError::Decode {
            command: invocation.display().to_string(),
            source,
        })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_line_prefers_stdout() {
        let text = run_command_line("sh -c 'echo \"  3  \"; echo ignored >&2'", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "3");
    }

    #[tokio::test]
    async fn test_run_command_line_surfaces_stderr() {
        let text = run_command_line("sh -c 'echo permission denied >&2; exit 1'", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "permission denied");
    }

    #[tokio::test]
    async fn test_run_command_line_times_out_quietly() {
        let text = run_command_line("sleep 30", Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_run_command_line_kill_mid_character() {
        let text = run_command_line(
            r"sh -c 'printf ok\\344\\270; exec sleep 30'",
            Duration::from_millis(300),
        )
        .await
        .unwrap();
        assert_eq!(text, "ok");
    }
}
