//! Parser for the line-oriented `adb devices -l` listing.
//!
//! Typical output:
//!
//! ```text
//! * daemon not running; starting now at tcp:5037
//! * daemon started successfully
//! List of devices attached
//! R58N12ABCDE            device usb:1-1 product:beyond1 model:SM_G973F device:beyond1 transport_id:1
//! 10.0.0.7:5555          offline transport_id:3
//! emulator-5554          device product:sdk_gphone64 model:sdk_gphone64_x86_64 transport_id:2
//! ```
//!
//! Two views of the listing exist:
//!
//! - [`parse_device_listing`] yields every device with its status and display
//!   name.  It feeds the device registry.
//! - [`offline_serials`] yields only the serials of offline, non-emulator
//!   devices.  It feeds the reconnector and looks at nothing but the first
//!   whitespace token and the presence of the `offline` marker.

use crate::domain::device::{Device, DeviceStatus};

const HEADER_PREFIX: &str = "List of devices";
const DAEMON_PREFIX: &str = "*";
const EMULATOR_PREFIX: &str = "emulator";
const OFFLINE_MARKER: &str = "offline";
const MODEL_KEY: &str = "model:";

/// Parses the full listing into devices, in listing order.
///
/// Lines with fewer than two tokens, the header, and adb daemon notices are
/// skipped.  A serial listed twice keeps its first entry.
pub fn parse_device_listing(text: &str) -> Vec<Device> {
    let mut devices: Vec<Device> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(HEADER_PREFIX) || line.starts_with(DAEMON_PREFIX)
        {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (Some(serial), Some(state)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        if devices.iter().any(|d| d.serial == serial) {
            continue;
        }

        let name = tokens
            .find_map(|t| t.strip_prefix(MODEL_KEY))
            .map(|model| model.replace('_', " "))
            .unwrap_or_else(|| serial.to_string());

        devices.push(
            Device::new(serial)
                .with_status(DeviceStatus::from_token(state))
                .with_name(name),
        );
    }

    devices
}

/// Returns the serials of devices whose line carries the `offline` marker.
///
/// Blank lines and emulator entries are skipped.  The serial is the first
/// whitespace-delimited token of the line.
pub fn offline_serials(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(EMULATOR_PREFIX))
        .filter(|line| line.contains(OFFLINE_MARKER))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
* daemon not running; starting now at tcp:5037
* daemon started successfully
List of devices attached
R58N12ABCDE            device usb:1-1 product:beyond1 model:SM_G973F device:beyond1 transport_id:1
10.0.0.7:5555          offline transport_id:3
emulator-5554          offline transport_id:2
ZY22CWXYZ              unauthorized usb:1-2 transport_id:4

";

    #[test]
    fn test_parse_skips_header_daemon_and_blank_lines() {
        // Act
        let devices = parse_device_listing(SAMPLE);

        // Assert
        let serials: Vec<&str> = devices.iter().map(|d| d.serial.as_str()).collect();
        assert_eq!(
            serials,
            vec!["R58N12ABCDE", "10.0.0.7:5555", "emulator-5554", "ZY22CWXYZ"]
        );
    }

    #[test]
    fn test_parse_reads_status_tokens() {
        let devices = parse_device_listing(SAMPLE);
        assert_eq!(devices[0].status, DeviceStatus::Online);
        assert_eq!(devices[1].status, DeviceStatus::Offline);
        assert_eq!(devices[3].status, DeviceStatus::Unauthorized);
    }

    #[test]
    fn test_parse_uses_model_as_display_name() {
        let devices = parse_device_listing(SAMPLE);
        assert_eq!(devices[0].name, "SM G973F");
        // No model token: fall back to the serial.
        assert_eq!(devices[1].name, "10.0.0.7:5555");
    }

    #[test]
    fn test_parse_ignores_duplicate_serials() {
        let text = "List of devices attached\nA device\nA offline\n";
        let devices = parse_device_listing(text);
        assert_eq!(devices.len(), 1);
        assert!(devices[0].status.is_online());
    }

    #[test]
    fn test_parse_empty_listing_yields_no_devices() {
        assert!(parse_device_listing("List of devices attached\n\n").is_empty());
        assert!(parse_device_listing("").is_empty());
    }

    #[test]
    fn test_offline_serials_excludes_emulators_and_online_devices() {
        // Act
        let serials = offline_serials(SAMPLE);

        // Assert
        assert_eq!(serials, vec!["10.0.0.7:5555".to_string()]);
    }

    #[test]
    fn test_offline_serials_handles_crlf_line_endings() {
        let text = "List of devices attached\r\nD1\toffline\r\nD2\tdevice\r\n";
        assert_eq!(offline_serials(text), vec!["D1".to_string()]);
    }
}
