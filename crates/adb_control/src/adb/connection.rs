//! Device enumeration: parsing the `adb devices` table

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::time::Duration;

use crate::error::Result;
use crate::exec::{CommandFormatter, OutputDecoder, ProcessRunner};

lazy_static! {
    /// `<serial><whitespace><status>`; anything after the status is `-l` detail
    static ref DEVICE_LINE: Regex = Regex::new(
        r"^(\S+)\s+(device|offline|unauthorized|authorizing|connecting|recovery|rescue|sideload|bootloader|host|no permissions)\b(.*)$"
    )
    .expect("device line pattern is valid");
}

/// Type of adb connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Usb,
    Tcp,
    Emulator,
}

impl ConnectionType {
    fn from_serial(serial: &str) -> Self {
        if serial.starts_with("emulator-") {
            Self::Emulator
        } else if serial.contains(':') {
            Self::Tcp
        } else {
            Self::Usb
        }
    }
}

/// State column of `adb devices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Device,
    Offline,
    Unauthorized,
    NoPermissions,
    Other(String),
}

impl DeviceStatus {
    fn parse(token: &str) -> Self {
        match token {
            "device" => Self::Device,
            "offline" => Self::Offline,
            "unauthorized" => Self::Unauthorized,
            "no permissions" => Self::NoPermissions,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One row of the device table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub serial: String,
    pub status: DeviceStatus,
    pub connection_type: ConnectionType,
    pub model: Option<String>,
}

/// Parse `adb devices [-l]` output; header and daemon chatter are skipped
pub fn parse_device_table(text: &str) -> Vec<DeviceInfo> {
    text.lines()
        .filter_map(|line| DEVICE_LINE.captures(line.trim()))
        .map(|caps| {
            let serial = caps[1].to_string();
            let model = caps[3]
                .split_whitespace()
                .find_map(|part| part.strip_prefix("model:"))
                .map(str::to_string);
            DeviceInfo {
                connection_type: ConnectionType::from_serial(&serial),
                status: DeviceStatus::parse(&caps[2]),
                serial,
                model,
            }
        })
        .collect()
}

/// List devices without opening a session
///
/// Enumeration precedes target selection, so no input-method capture happens.
pub async fn list_devices(adb_path: &str, timeout: Duration) -> Result<Vec<DeviceInfo>> {
    let invocation = CommandFormatter::new(adb_path, None)
        .untargeted("devices -l")?
        .with_timeout(Some(timeout));
    let raw = ProcessRunner::new().run(&invocation).await?;
    let text = OutputDecoder::default()
        .decode_stream(&raw.stdout, "stdout")
        .map_err(|source| crate::error::AdbError::Decode {
            command: invocation.display().to_string(),
            source,
        })?;
    Ok(parse_device_table(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_listing() {
        let text = "List of devices attached\nABC123  device\nDEF456  device\n";
        let serials: Vec<String> = parse_device_table(text)
            .into_iter()
            .map(|d| d.serial)
            .collect();
        assert_eq!(serials, vec!["ABC123", "DEF456"]);
    }

    #[test]
    fn test_parse_statuses_and_chatter() {
        let text = "* daemon not running; starting now at tcp:5037\n\
                    * daemon started successfully\n\
                    List of devices attached\n\
                    emulator-5554\tdevice\n\
                    192.168.1.20:5555\toffline\n\
                    0123456789ABCDEF\tunauthorized\n\
                    \n";
        let devices = parse_device_table(text);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].connection_type, ConnectionType::Emulator);
        assert_eq!(devices[1].status, DeviceStatus::Offline);
        assert_eq!(devices[1].connection_type, ConnectionType::Tcp);
        assert_eq!(devices[2].status, DeviceStatus::Unauthorized);
        assert_eq!(devices[2].connection_type, ConnectionType::Usb);
    }

    #[test]
    fn test_parse_long_listing() {
        let text = "List of devices attached\n\
                    R58M123ABC  device usb:1-1 product:beyond1 model:SM_G973F device:beyond1 transport_id:1\n";
        let devices = parse_device_table(text);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "R58M123ABC");
        assert_eq!(devices[0].status, DeviceStatus::Device);
        assert_eq!(devices[0].model.as_deref(), Some("SM_G973F"));
    }

    #[test]
    fn test_device_info_json() {
        let devices = parse_device_table("192.168.1.20:5555\tdevice\n");
        let json = serde_json::to_value(&devices[0]).unwrap();
        assert_eq!(json["serial"], "192.168.1.20:5555");
        assert_eq!(json["status"], "device");
        assert_eq!(json["connection_type"], "tcp");
        assert!(json["model"].is_null());
    }

    #[test]
    fn test_devices_word_is_not_a_status() {
        assert!(parse_device_table("List of devices attached\n").is_empty());
        assert!(parse_device_table("foo devices\n").is_empty());
    }
}
