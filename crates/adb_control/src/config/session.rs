//! Per-session configuration

use std::time::Duration;

use super::TimingConfig;

/// Timeout used by the bounded entry points (`run_command_line`, input-method capture)
pub const DEFAULT_BOUNDED_TIMEOUT: Duration = Duration::from_secs(20);

/// Configuration for a [`DeviceSession`](crate::DeviceSession)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path or name of the adb executable
    pub adb_path: String,
    /// Target serial; `None` addresses the only attached device
    pub device_id: Option<String>,
    /// Log every formatted invocation at info level
    pub debug: bool,
    /// WHATWG label of the primary output encoding (UTF-8 is always the fallback)
    pub encoding: String,
    /// Timeout for `command`/`shell`; `None` waits for natural completion
    pub command_timeout: Option<Duration>,
    /// Timeout for the bounded entry points
    pub bounded_timeout: Duration,
    /// Timeout for the input-method query issued while opening the session
    pub capture_timeout: Duration,
    pub timing: TimingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            adb_path: "adb".to_string(),
            device_id: None,
            debug: true,
            encoding: "utf-8".to_string(),
            command_timeout: None,
            bounded_timeout: DEFAULT_BOUNDED_TIMEOUT,
            capture_timeout: DEFAULT_BOUNDED_TIMEOUT,
            timing: TimingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new SessionConfig
    pub fn new() -> Self {
        Self::default()
    }

    /// Set adb executable path
    pub fn with_adb_path(mut self, adb_path: impl Into<String>) -> Self {
        self.adb_path = adb_path.into();
        self
    }

    /// Set target device ID
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Set debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set primary output encoding label (e.g. "gbk")
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set timeout for the primary command path
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Set timeout for bounded commands
    pub fn with_bounded_timeout(mut self, timeout: Duration) -> Self {
        self.bounded_timeout = timeout;
        self
    }

    /// Set timeout for the input-method capture during construction
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// Set timing config
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.adb_path, "adb");
        assert_eq!(config.device_id, None);
        assert!(config.debug);
        assert_eq!(config.command_timeout, None);
        assert_eq!(config.bounded_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new()
            .with_adb_path("/opt/platform-tools/adb")
            .with_device_id("emulator-5554")
            .with_debug(false)
            .with_encoding("gbk")
            .with_command_timeout(Duration::from_secs(5));

        assert_eq!(config.adb_path, "/opt/platform-tools/adb");
        assert_eq!(config.device_id, Some("emulator-5554".to_string()));
        assert!(!config.debug);
        assert_eq!(config.encoding, "gbk");
        assert_eq!(config.command_timeout, Some(Duration::from_secs(5)));
    }
}
