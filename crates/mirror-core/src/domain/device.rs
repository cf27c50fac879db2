//! Devices as seen by the device bridge.
//!
//! A [`Device`] is identified by its serial string.  The serial is unique
//! across discovery polls, so two listings that mention the same serial
//! describe the same physical (or virtual) device.
//!
//! The reserved placeholder entry ([`PLACEHOLDER_SERIAL`]) stands for
//! "no device selected".  It is always present in the visible device list
//! and is never removed by a discovery diff.

use serde::{Deserialize, Serialize};

/// Serial of the reserved "no device" entry.
pub const PLACEHOLDER_SERIAL: &str = "---";

/// Connection status reported by `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// `device` – authorised and reachable.
    Online,
    /// `offline` – known to adb but not responding.
    Offline,
    /// `unauthorized` – the RSA key prompt has not been accepted.
    Unauthorized,
    /// Any other state token (`recovery`, `sideload`, `no permissions`, ...).
    Other(String),
}

impl DeviceStatus {
    /// Parses the state token of one `adb devices` line.
    pub fn from_token(token: &str) -> Self {
        match token {
            "device" => DeviceStatus::Online,
            "offline" => DeviceStatus::Offline,
            "unauthorized" => DeviceStatus::Unauthorized,
            other => DeviceStatus::Other(other.to_string()),
        }
    }

    /// Returns the adb token for this status.
    pub fn as_str(&self) -> &str {
        match self {
            DeviceStatus::Online => "device",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Unauthorized => "unauthorized",
            DeviceStatus::Other(s) => s,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, DeviceStatus::Online)
    }
}

/// One entry of the visible device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Unique device serial (`emulator-5554`, `R58N12ABCDE`, `10.0.0.7:5555`).
    pub serial: String,
    pub status: DeviceStatus,
    /// Human-readable name shown in the device selector.
    pub name: String,
}

impl Device {
    /// Creates an online device whose display name is its serial.
    pub fn new(serial: impl Into<String>) -> Self {
        let serial = serial.into();
        Self {
            name: serial.clone(),
            serial,
            status: DeviceStatus::Online,
        }
    }

    /// Returns a copy of `self` with the given status.
    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns a copy of `self` with the given display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The reserved "no device" entry.
    pub fn placeholder() -> Self {
        Self {
            serial: PLACEHOLDER_SERIAL.to_string(),
            status: DeviceStatus::Other("none".to_string()),
            name: "No device".to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        is_placeholder_serial(&self.serial)
    }

    /// Returns `true` for emulator instances, which adb names `emulator-<port>`.
    pub fn is_emulator(&self) -> bool {
        self.serial.starts_with("emulator")
    }
}

/// Returns `true` if `serial` is the reserved placeholder serial.
pub fn is_placeholder_serial(serial: &str) -> bool {
    serial == PLACEHOLDER_SERIAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_known_tokens() {
        assert_eq!(DeviceStatus::from_token("device"), DeviceStatus::Online);
        assert_eq!(DeviceStatus::from_token("offline"), DeviceStatus::Offline);
        assert_eq!(
            DeviceStatus::from_token("unauthorized"),
            DeviceStatus::Unauthorized
        );
    }

    #[test]
    fn test_status_keeps_unknown_token_verbatim() {
        // Arrange / Act
        let status = DeviceStatus::from_token("recovery");

        // Assert
        assert_eq!(status, DeviceStatus::Other("recovery".to_string()));
        assert_eq!(status.as_str(), "recovery");
    }

    #[test]
    fn test_new_device_uses_serial_as_name() {
        let device = Device::new("ABC123");
        assert_eq!(device.name, "ABC123");
        assert!(device.status.is_online());
    }

    #[test]
    fn test_placeholder_is_recognised() {
        let placeholder = Device::placeholder();
        assert!(placeholder.is_placeholder());
        assert!(!Device::new("ABC123").is_placeholder());
    }

    #[test]
    fn test_emulator_detection_uses_serial_prefix() {
        assert!(Device::new("emulator-5554").is_emulator());
        assert!(!Device::new("10.0.0.7:5555").is_emulator());
    }
}
