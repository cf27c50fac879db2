//! Presentation bridge: maps UI intents onto the session controller.
//!
//! A presentation layer (a desktop window, or the line console in
//! [`console`]) never calls the controller directly.  It sends [`UiIntent`]s
//! to [`PresentationBridge::dispatch`] and gets back a serialisable
//! [`SessionStatusDto`] wrapped in a [`CommandResult`].
//!
//! # `CommandResult<T>` wrapper
//!
//! Every bridge call returns `CommandResult<T>` rather than `Result<T, E>`,
//! so every response has the same JSON shape:
//! `{ success: bool, data: T | null, error: string | null }`.
//!
//! Input intents that the controller ignores (no connected session, or the
//! UI selection changed) still succeed; the returned status shows that
//! nothing happened.  Only a failed device selection is an error.

pub mod console;

use mirror_core::{ActionPhase, Device};
use serde::{Deserialize, Serialize};

use crate::application::control_session::{SessionController, SessionStatus};
use crate::application::manage_devices::{read_registry, SharedRegistry};

// ── Intents ───────────────────────────────────────────────────────────────────

/// A user action raised by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum UiIntent {
    DeviceSelected { serial: String },
    FlipToggled { flip: bool },
    AutomationToggled,
    /// Pointer position in window coordinates.
    Pointer { x: f64, y: f64, phase: ActionPhase },
    /// Raw host key code.
    Key { code: i32, phase: ActionPhase },
    HomePressed,
    BackPressed,
    WindowClosed,
}

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// DTO for one entry of the device selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDto {
    pub serial: String,
    pub name: String,
    pub status: String,
}

impl From<&Device> for DeviceDto {
    fn from(d: &Device) -> Self {
        Self {
            serial: d.serial.clone(),
            name: d.name.clone(),
            status: d.status.as_str().to_string(),
        }
    }
}

/// DTO for the session shown in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusDto {
    pub session_id: Option<String>,
    pub serial: Option<String>,
    pub state: String,
    pub device_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub running: bool,
    pub flip: bool,
    /// Window title derived from the fields above.
    pub title: String,
}

impl From<&SessionStatus> for SessionStatusDto {
    fn from(s: &SessionStatus) -> Self {
        Self {
            session_id: s.session_id.map(|id| id.to_string()),
            serial: s.serial.clone(),
            state: s.state.as_str().to_string(),
            device_name: s.device_name.clone(),
            width: s.resolution.map(|r| r.width),
            height: s.resolution.map(|r| r.height),
            running: s.running,
            flip: s.flip,
            title: window_title(s),
        }
    }
}

/// `Serial: <device>`, with `  Running` appended while automation runs.
pub fn window_title(status: &SessionStatus) -> String {
    let Some(serial) = &status.serial else {
        return "No device".to_string();
    };
    let name = status.device_name.as_deref().unwrap_or(serial);
    if status.running {
        format!("Serial: {name}  Running")
    } else {
        format!("Serial: {name}")
    }
}

/// Unified response wrapper used by bridge calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// Routes intents to the controller and renders its state as DTOs.
#[derive(Clone)]
pub struct PresentationBridge {
    controller: SessionController,
    registry: SharedRegistry,
}

impl PresentationBridge {
    pub fn new(controller: SessionController, registry: SharedRegistry) -> Self {
        Self {
            controller,
            registry,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Applies `intent` and returns the resulting status.
    pub fn dispatch(&self, intent: UiIntent) -> CommandResult<SessionStatusDto> {
        match intent {
            UiIntent::DeviceSelected { serial } => {
                if let Err(e) = self.controller.select_device(&serial) {
                    return CommandResult::err(e.to_string());
                }
            }
            UiIntent::FlipToggled { flip } => {
                self.controller.set_flip(flip);
            }
            UiIntent::AutomationToggled => {
                self.controller.toggle_automation();
            }
            UiIntent::Pointer { x, y, phase } => {
                self.controller.pointer_event(x, y, phase);
            }
            UiIntent::Key { code, phase } => {
                self.controller.key_event(code, phase);
            }
            UiIntent::HomePressed => {
                self.controller.send_home();
            }
            UiIntent::BackPressed => {
                self.controller.send_back();
            }
            UiIntent::WindowClosed => self.controller.close(),
        }
        self.status()
    }

    pub fn status(&self) -> CommandResult<SessionStatusDto> {
        CommandResult::ok(SessionStatusDto::from(&self.controller.status()))
    }

    /// The device selector contents, placeholder first.
    pub fn devices(&self) -> CommandResult<Vec<DeviceDto>> {
        let devices = read_registry(&self.registry).snapshot();
        CommandResult::ok(devices.iter().map(DeviceDto::from).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::control_session::ControllerSettings;
    use crate::application::manage_devices::{write_registry, DeviceRegistry};
    use crate::infrastructure::adb::mock::MockConnector;
    use mirror_core::{Resolution, SessionState, PLACEHOLDER_SERIAL};
    use std::sync::Arc;

    fn make_bridge(serials: &[&str]) -> PresentationBridge {
        let registry = DeviceRegistry::shared();
        let devices: Vec<Device> = serials.iter().map(|s| Device::new(*s)).collect();
        write_registry(&registry).reconcile(&devices);
        let connector = Arc::new(MockConnector::new("Pixel 7", Resolution::new(1080, 2400)));
        let controller = SessionController::new(
            Arc::clone(&registry),
            connector,
            ControllerSettings::default(),
        );
        PresentationBridge::new(controller, registry)
    }

    fn idle_status() -> SessionStatus {
        SessionStatus {
            session_id: None,
            serial: None,
            state: SessionState::Idle,
            device_name: None,
            resolution: None,
            running: false,
            flip: false,
            ui_selection: None,
        }
    }

    #[test]
    fn test_command_result_ok_sets_success_true() {
        let r: CommandResult<i32> = CommandResult::ok(42);
        assert!(r.success);
        assert_eq!(r.data.unwrap(), 42);
        assert!(r.error.is_none());
    }

    #[test]
    fn test_command_result_err_sets_success_false() {
        let r: CommandResult<i32> = CommandResult::err("something went wrong");
        assert!(!r.success);
        assert!(r.data.is_none());
        assert_eq!(r.error.unwrap(), "something went wrong");
    }

    #[test]
    fn test_window_title_shows_device_and_running() {
        // Arrange
        let mut status = idle_status();
        status.serial = Some("ABC123".to_string());
        status.device_name = Some("Pixel 7".to_string());

        // Act
        let idle = window_title(&status);
        status.running = true;
        let running = window_title(&status);

        // Assert
        assert_eq!(idle, "Serial: Pixel 7");
        assert_eq!(running, "Serial: Pixel 7  Running");
        assert_eq!(window_title(&idle_status()), "No device");
    }

    #[test]
    fn test_devices_lists_placeholder_first() {
        let bridge = make_bridge(&["B", "A"]);

        let devices = bridge.devices().data.expect("devices");

        let serials: Vec<&str> = devices.iter().map(|d| d.serial.as_str()).collect();
        assert_eq!(serials, vec![PLACEHOLDER_SERIAL, "A", "B"]);
    }

    #[test]
    fn test_selecting_unknown_device_returns_error_result() {
        // Arrange
        let bridge = make_bridge(&["ABC123"]);

        // Act
        let result = bridge.dispatch(UiIntent::DeviceSelected {
            serial: "XYZ999".to_string(),
        });

        // Assert
        assert!(!result.success);
        assert!(result.error.expect("error message").contains("XYZ999"));
        assert_eq!(bridge.controller().state(), SessionState::Idle);
    }

    #[test]
    fn test_ignored_input_still_succeeds() {
        let bridge = make_bridge(&[]);

        let result = bridge.dispatch(UiIntent::HomePressed);

        assert!(result.success);
        assert_eq!(result.data.expect("status").state, "idle");
    }

    #[test]
    fn test_intent_json_shape() {
        let intent: UiIntent =
            serde_json::from_str(r#"{"intent":"device_selected","serial":"ABC123"}"#)
                .expect("valid intent JSON");
        assert_eq!(
            intent,
            UiIntent::DeviceSelected {
                serial: "ABC123".to_string()
            }
        );
    }
}
