//! Control actions sent to the device.
//!
//! A [`ControlAction`] is a single input event: a touch at a device pixel, or
//! an Android key code.  Both carry an [`ActionPhase`].  Actions are
//! fire-and-forget; nothing in the session core waits for acknowledgement.
//!
//! Touch coordinates are always expressed in device pixel space.  Scaling
//! from window coordinates happens in the input translator before an action
//! is built.

use serde::{Deserialize, Serialize};

use crate::keymap::android::KeyCode;

/// Phase of a touch or key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionPhase {
    Down,
    Move,
    Up,
}

/// One input event for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAction {
    /// A touch at device pixel (`x`, `y`).
    Touch { x: i32, y: i32, phase: ActionPhase },
    /// An Android key event.
    Keycode { code: KeyCode, phase: ActionPhase },
}

impl ControlAction {
    /// Returns the down/up pair for a single tap at (`x`, `y`).
    pub fn tap(x: i32, y: i32) -> [ControlAction; 2] {
        [
            ControlAction::Touch {
                x,
                y,
                phase: ActionPhase::Down,
            },
            ControlAction::Touch {
                x,
                y,
                phase: ActionPhase::Up,
            },
        ]
    }

    /// Returns the down/up pair for a single key press.
    pub fn key_press(code: KeyCode) -> [ControlAction; 2] {
        [
            ControlAction::Keycode {
                code,
                phase: ActionPhase::Down,
            },
            ControlAction::Keycode {
                code,
                phase: ActionPhase::Up,
            },
        ]
    }

    pub fn phase(&self) -> ActionPhase {
        match self {
            ControlAction::Touch { phase, .. } | ControlAction::Keycode { phase, .. } => *phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_is_down_then_up_at_same_point() {
        // Act
        let [down, up] = ControlAction::tap(300, 1000);

        // Assert
        assert_eq!(
            down,
            ControlAction::Touch {
                x: 300,
                y: 1000,
                phase: ActionPhase::Down
            }
        );
        assert_eq!(
            up,
            ControlAction::Touch {
                x: 300,
                y: 1000,
                phase: ActionPhase::Up
            }
        );
    }

    #[test]
    fn test_key_press_is_down_then_up() {
        let pair = ControlAction::key_press(KeyCode::HOME);
        assert_eq!(pair[0].phase(), ActionPhase::Down);
        assert_eq!(pair[1].phase(), ActionPhase::Up);
    }
}
