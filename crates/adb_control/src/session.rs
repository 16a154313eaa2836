//! Stateful façade binding a target device to the execution core

use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::adb::{parse_device_table, DeviceInfo, DeviceStatus};
use crate::config::{SessionConfig, TimingConfig};
use crate::error::{AdbError, Result};
use crate::exec::{
    CommandFormatter, ExecutionResult, ExitState, Invocation, OutputDecoder, ProcessRunner,
    RawOutput,
};

/// Shell command that prints the active input method id
pub(crate) const IME_QUERY: &str = "settings get secure default_input_method";

/// Result of [`DeviceSession::restore_input_method`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The device reports the captured input method again
    Restored,
    /// `ime set` ran but the device reports something else
    Mismatch { expected: String, actual: String },
    /// The restore or verification command could not be run
    Failed(String),
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored)
    }
}

/// A session with one adb target
///
/// Holds the target serial and debug flag for its whole lifetime, plus the
/// input method that was active when the session was opened. Calls are
/// sequential; a device is a serially-accessed resource, so share a session
/// between tasks only behind your own synchronization.
#[derive(Debug)]
pub struct DeviceSession {
    formatter: CommandFormatter,
    runner: ProcessRunner,
    decoder: OutputDecoder,
    debug: bool,
    command_timeout: Option<Duration>,
    bounded_timeout: Duration,
    timing: TimingConfig,
    span: Span,
    default_input_method: String,
}

impl DeviceSession {
    /// Open a session and capture the device's current input method
    ///
    /// This issues `adb shell settings get secure default_input_method` before
    /// returning, bounded by `config.capture_timeout`. It fails when adb cannot
    /// be launched or the query does not complete successfully.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let span = info_span!(
            "adb_session",
            device = config.device_id.as_deref().unwrap_or("default")
        );
        Self::open_with_span(config, span).await
    }

    /// Like [`open`](Self::open), logging into the given span
    pub async fn open_with_span(config: SessionConfig, span: Span) -> Result<Self> {
        let mut session = Self {
            formatter: CommandFormatter::new(config.adb_path, config.device_id),
            runner: ProcessRunner::new(),
            decoder: OutputDecoder::for_label(&config.encoding)?,
            debug: config.debug,
            command_timeout: config.command_timeout,
            bounded_timeout: config.bounded_timeout,
            timing: config.timing,
            span,
            default_input_method: String::new(),
        };
        session.default_input_method = session
            .capture_default_input_method(config.capture_timeout)
            .await?;
        session
            .span
            .in_scope(|| info!("current ime: {}", session.default_input_method));
        Ok(session)
    }

    async fn capture_default_input_method(&self, timeout: Duration) -> Result<String> {
        let invocation = self.formatter.shell(IME_QUERY).with_timeout(Some(timeout));
        self.execute_checked(invocation).await
    }

    pub fn target(&self) -> Option<&str> {
        self.formatter.target()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Input method id captured when the session was opened
    pub fn default_input_method(&self) -> &str {
        &self.default_input_method
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Timeout applied to `command` and `shell`; `None` waits indefinitely
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }

    pub fn formatter(&self) -> &CommandFormatter {
        &self.formatter
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    fn show_log(&self, invocation: &Invocation) {
        if self.debug {
            info!("ADB: {}", invocation);
        } else {
            debug!("ADB: {}", invocation);
        }
    }

    async fn run_raw(&self, invocation: &Invocation) -> Result<RawOutput> {
        async {
            self.show_log(invocation);
            let raw = self.runner.run(invocation).await?;
            if raw.exit == ExitState::TimedOut {
                warn!("`{}` killed after {:?}", invocation, raw.elapsed);
            }
            Ok(raw)
        }
        .instrument(self.span.clone())
        .await
    }

    fn decode_error(invocation: &Invocation, source: crate::exec::DecodeError) -> AdbError {
        AdbError::Decode {
            command: invocation.display().to_string(),
            source,
        }
    }

    /// Run an invocation and decode both streams, keeping the exit state
    pub async fn execute(&self, invocation: Invocation) -> Result<ExecutionResult> {
        let raw = self.run_raw(&invocation).await?;
        self.decoder
            .decode_output(&raw)
            .map_err(|e| Self::decode_error(&invocation, e))
    }

    /// Like [`execute`](Self::execute), but anything other than exit code 0
    /// is an [`AdbError::CommandFailed`]
    pub(crate) async fn execute_checked(&self, invocation: Invocation) -> Result<String> {
        let result = self.execute(invocation.clone()).await?;
        if !result.success() {
            return Err(AdbError::CommandFailed(format!(
                "`{}` ended with {:?}: {}",
                invocation,
                result.exit,
                result.text()
            )));
        }
        Ok(result.into_text())
    }

    /// Run an invocation and return stdout, or stderr when stdout is empty
    pub async fn run_text(&self, invocation: Invocation) -> Result<String> {
        let raw = self.run_raw(&invocation).await?;
        self.decoder
            .decode_text(&raw)
            .map_err(|e| Self::decode_error(&invocation, e))
    }

    /// `adb -s <target> <cmd>`
    pub async fn command(&self, cmd: &str) -> Result<String> {
        let invocation = self.formatter.direct(cmd)?.with_timeout(self.command_timeout);
        self.run_text(invocation).await
    }

    /// `adb -s <target> <cmd>` bounded by `timeout`
    pub async fn command_with_timeout(&self, cmd: &str, timeout: Duration) -> Result<String> {
        let invocation = self.formatter.direct(cmd)?.with_timeout(Some(timeout));
        self.run_text(invocation).await
    }

    /// Direct command from pre-split tokens
    pub async fn command_args<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        let invocation = self
            .formatter
            .direct_args(args)
            .with_timeout(self.command_timeout);
        self.run_text(invocation).await
    }

    /// `adb -s <target> shell <cmd>`
    pub async fn shell(&self, cmd: &str) -> Result<String> {
        let invocation = self.formatter.shell(cmd).with_timeout(self.command_timeout);
        self.run_text(invocation).await
    }

    /// `adb -s <target> shell <cmd>` bounded by `timeout`
    pub async fn shell_with_timeout(&self, cmd: &str, timeout: Duration) -> Result<String> {
        let invocation = self.formatter.shell(cmd).with_timeout(Some(timeout));
        self.run_text(invocation).await
    }

    /// Put the captured input method back and verify it took
    ///
    /// Never fails: problems are logged at error level and reported through
    /// the returned outcome. The check is a best effort against live device
    /// state, so a mismatch can also mean the device changed it again.
    pub async fn restore_input_method(&self) -> RestoreOutcome {
        let expected = self.default_input_method.clone();
        let outcome = match self.try_restore(&expected).await {
            Ok(actual) if actual == expected => RestoreOutcome::Restored,
            Ok(actual) => RestoreOutcome::Mismatch { expected, actual },
            Err(e) => RestoreOutcome::Failed(e.to_string()),
        };
        self.span.in_scope(|| match &outcome {
            RestoreOutcome::Restored => info!("recover ime to {}", self.default_input_method),
            RestoreOutcome::Mismatch { expected, actual } => {
                error!("recover ime failed: expected {}, device reports {}", expected, actual)
            }
            RestoreOutcome::Failed(reason) => error!("recover ime failed: {}", reason),
        });
        outcome
    }

    async fn try_restore(&self, ime: &str) -> Result<String> {
        let set = format!("ime set {}", ime);
        self.shell_with_timeout(&set, self.bounded_timeout).await?;
        let settle = TimingConfig::duration(self.timing.ime_settle_delay);
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        self.shell_with_timeout(IME_QUERY, self.bounded_timeout).await
    }

    /// Every row of `adb devices`, whatever its status
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let invocation = self
            .formatter
            .untargeted("devices")?
            .with_timeout(Some(self.bounded_timeout));
        let result = self.execute(invocation).await?;
        Ok(parse_device_table(&result.stdout))
    }

    /// Serials of attached devices in `device` state, in listing order
    ///
    /// Enumeration never carries the session's target flag.
    pub async fn list_connected_targets(&self) -> Result<Vec<String>> {
        Ok(self
            .list_devices()
            .await?
            .into_iter()
            .filter(|d| d.status == DeviceStatus::Device)
            .map(|d| d.serial)
            .collect())
    }

    /// Serial of the only attached device (`adb get-serialno`)
    pub async fn local_serial(&self) -> Result<String> {
        let invocation = self
            .formatter
            .untargeted("get-serialno")?
            .with_timeout(Some(self.bounded_timeout));
        self.run_text(invocation).await
    }
}
