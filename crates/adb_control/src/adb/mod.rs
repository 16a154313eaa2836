//! Device helpers built on [`DeviceSession`](crate::DeviceSession)
//!
//! This module provides:
//! - `connection`: Device enumeration and the `adb devices` table
//! - `device`: Key events, taps and swipes
//! - `input`: Input method and text entry
//! - `app`: App lifecycle and queries
//! - `screenshot`: File transfer and screen capture

mod app;
mod connection;
mod device;
mod input;
mod screenshot;

pub use connection::{list_devices, parse_device_table, ConnectionType, DeviceInfo, DeviceStatus};
pub use device::KeyCode;
pub use input::ADB_KEYBOARD_IME;
pub use screenshot::Screenshot;
