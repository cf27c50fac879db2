//! TranslateInputUseCase: window input to device control actions.
//!
//! # Coordinate scaling
//!
//! The mirrored frame is displayed with its longest side scaled to
//! `display_max` pixels.  A pointer position inside the window therefore has
//! to be divided by
//!
//! ```text
//! ratio = display_max / max(device_width, device_height)
//! ```
//!
//! to land on the matching device pixel.  The mapping is linear, so scaling
//! the window position by `k` scales the device position by `k`.
//!
//! # Keys
//!
//! Host key codes go through [`KeyMapper::host_to_android`].  Unmapped keys
//! come back as [`KeyCode::UNKNOWN`] and are logged; no action is built for
//! them.

use mirror_core::{ActionPhase, ControlAction, KeyCode, KeyMapper, Resolution};
use tracing::debug;

/// A position in device pixel space, before rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePoint {
    pub x: f64,
    pub y: f64,
}

/// Maps window input into device control actions.
#[derive(Debug, Clone, Copy)]
pub struct InputTranslator {
    display_max: u32,
}

impl InputTranslator {
    pub fn new(display_max: u32) -> Self {
        Self { display_max }
    }

    pub fn display_max(&self) -> u32 {
        self.display_max
    }

    /// `display_max / max(resolution)`, or `None` when either side is zero.
    pub fn ratio(&self, resolution: Resolution) -> Option<f64> {
        let device_max = resolution.max_dimension();
        if device_max == 0 || self.display_max == 0 {
            return None;
        }
        Some(f64::from(self.display_max) / f64::from(device_max))
    }

    /// Converts a window position to device pixel space.
    ///
    /// Returns `None` when the ratio is undefined.
    pub fn map_pointer(&self, raw_x: f64, raw_y: f64, resolution: Resolution) -> Option<DevicePoint> {
        let ratio = self.ratio(resolution)?;
        Some(DevicePoint {
            x: raw_x / ratio,
            y: raw_y / ratio,
        })
    }

    /// Converts a host key code to an Android key code.
    pub fn map_key(&self, raw: i32) -> KeyCode {
        let code = KeyMapper::host_to_android(raw);
        if code.is_unknown() {
            debug!(raw, "unknown host key code");
        }
        code
    }

    /// Builds the touch action for a window position.
    pub fn pointer_action(
        &self,
        raw_x: f64,
        raw_y: f64,
        phase: ActionPhase,
        resolution: Resolution,
    ) -> Option<ControlAction> {
        let point = self.map_pointer(raw_x, raw_y, resolution)?;
        Some(ControlAction::Touch {
            x: point.x.round() as i32,
            y: point.y.round() as i32,
            phase,
        })
    }

    /// Builds the key action for a host key code, or `None` if unmapped.
    pub fn key_action(&self, raw: i32, phase: ActionPhase) -> Option<ControlAction> {
        let code = self.map_key(raw);
        (!code.is_unknown()).then_some(ControlAction::Keycode { code, phase })
    }
}
