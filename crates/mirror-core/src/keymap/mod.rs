//! Key code translation between the host keyboard and the Android device.
//!
//! The canonical representation on the device side is the Android
//! `KEYCODE_*` value ([`KeyCode`]).  Host key codes are translated at the
//! input boundary, once per key event.

pub mod android;
pub mod host;

pub use android::KeyCode;

/// Unified key mapper.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a host key code to an Android [`KeyCode`].
    ///
    /// Returns [`KeyCode::UNKNOWN`] if no mapping exists for `raw`.
    pub fn host_to_android(raw: i32) -> KeyCode {
        host::host_to_android(raw)
    }
}
