//! Host key code to Android key code translation.
//!
//! Host key codes follow the Qt `Qt::Key` numbering the presentation layer
//! reports: printable keys use their ASCII value and special keys live in
//! the `0x0100_00xx` block.
//!
//! # Rule order
//!
//! 1. Digits `'0'..='9'` map onto the contiguous Android digit range.
//! 2. Letters, upper- or lowercase, map onto the contiguous letter range, so
//!    `'A'` and `'a'` produce the same key code.
//! 3. Everything else goes through [`SPECIAL_KEYS`].
//!
//! Unmapped codes return [`KeyCode::UNKNOWN`].

use super::android::KeyCode;

/// `Qt::Key_Space`.
pub const HOST_SPACE: i32 = 0x20;
/// `Qt::Key_Tab`.
pub const HOST_TAB: i32 = 0x0100_0001;
/// `Qt::Key_Backspace`.
pub const HOST_BACKSPACE: i32 = 0x0100_0003;
/// `Qt::Key_Return`.
pub const HOST_RETURN: i32 = 0x0100_0004;
/// `Qt::Key_Shift`.
pub const HOST_SHIFT: i32 = 0x0100_0020;
/// `Qt::Key_Control`.
pub const HOST_CONTROL: i32 = 0x0100_0021;

/// Irregular keys that are not covered by the arithmetic rules.
const SPECIAL_KEYS: [(i32, KeyCode); 6] = [
    (HOST_SPACE, KeyCode::SPACE),
    (HOST_BACKSPACE, KeyCode::DEL),
    (HOST_SHIFT, KeyCode::SHIFT_LEFT),
    (HOST_RETURN, KeyCode::ENTER),
    (HOST_TAB, KeyCode::TAB),
    (HOST_CONTROL, KeyCode::CTRL_LEFT),
];

/// Translates a host key code to an Android key code.
///
/// Returns [`KeyCode::UNKNOWN`] when no mapping exists, including for the
/// `-1` "no key" value some toolkits report.
pub fn host_to_android(raw: i32) -> KeyCode {
    let mapped = match raw {
        0x30..=0x39 => KeyCode::digit((raw - 0x30) as u8),
        0x41..=0x5A => KeyCode::letter((raw - 0x41) as u8),
        0x61..=0x7A => KeyCode::letter((raw - 0x61) as u8),
        _ => SPECIAL_KEYS
            .iter()
            .find(|(host, _)| *host == raw)
            .map(|(_, code)| *code),
    };
    mapped.unwrap_or(KeyCode::UNKNOWN)
}
