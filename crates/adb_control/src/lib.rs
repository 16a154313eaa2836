//! adb_control: bounded adb command execution and device sessions
//!
//! This library provides:
//! - A process runner that enforces timeouts and keeps partial output on kill
//! - Formatting of direct (`adb -s ID cmd`) and shell (`adb -s ID shell cmd`) calls
//! - Output decoding with a configurable encoding and UTF-8 fallback
//! - `DeviceSession`, which ties these together for one target device and
//!   remembers its input method for later restoration
//! - Gesture, text-input, app and screenshot helpers on top of the session
//!
//! # Example
//!
//! ```no_run
//! use adb_control::{DeviceSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> adb_control::Result<()> {
//!     let session = DeviceSession::open(
//!         SessionConfig::new().with_device_id("emulator-5554"),
//!     )
//!     .await?;
//!
//!     session.tap(500, 300).await?;
//!     println!("{}", session.shell("getprop ro.build.version.release").await?);
//!
//!     let outcome = session.restore_input_method().await;
//!     println!("restored: {}", outcome.is_restored());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;
pub mod config;
pub mod exec;
pub mod session;

// Device helpers
pub mod adb;

// Re-export commonly used types and functions
pub use error::{AdbError, Result};

pub use config::{SessionConfig, TimingConfig, DEFAULT_BOUNDED_TIMEOUT};

pub use exec::{
    run_command_line, CommandFormatter, DecodeError, ExecutionResult, ExitState, Invocation,
    OutputDecoder, ProcessRunner, RawOutput,
};

pub use session::{DeviceSession, RestoreOutcome};

pub use adb::{
    list_devices, parse_device_table, ConnectionType, DeviceInfo, DeviceStatus, KeyCode,
    Screenshot, ADB_KEYBOARD_IME,
};
