//! Configuration module for adb_control
//!
//! This module contains:
//! - `session`: Per-session settings (target, debug flag, encoding, timeouts)
//! - `timing`: Delays applied after device operations

mod session;
mod timing;

pub use session::{SessionConfig, DEFAULT_BOUNDED_TIMEOUT};
pub use timing::TimingConfig;
