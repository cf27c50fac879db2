//! Line-oriented console for driving the bridge from stdin.
//!
//! ```text
//! select ABC123      switch to a device (`select ---` to deselect)
//! flip on|off        mirror frames horizontally
//! auto               toggle automation
//! tap 100 400        pointer down + up at a window position
//! down|move|up X Y   single pointer event
//! key a | key 32     key press by character or raw host code
//! home | back        navigation keys
//! devices | status   print the device list or the session
//! quit               close the window
//! ```

use mirror_core::ActionPhase;
use thiserror::Error;

use super::UiIntent;

/// Error type for console input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command `{0}`, try `help`")]
    UnknownCommand(String),

    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("`{0}` is not a number")]
    InvalidNumber(String),

    #[error("expected `on` or `off`, got `{0}`")]
    InvalidToggle(String),
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Intents to dispatch, in order.
    Dispatch(Vec<UiIntent>),
    Devices,
    Status,
    Help,
    Quit,
    /// A blank line.
    Nothing,
}

pub const HELP: &str = "\
commands:
  select <serial>    switch to a device (`select ---` to deselect)
  flip on|off        mirror frames horizontally
  auto               toggle automation
  tap <x> <y>        pointer down + up at a window position
  down|move|up <x> <y>
  key <char|code>    key press
  home | back
  devices | status
  quit";

/// Parses one console line.
///
/// # Errors
///
/// Returns a [`ConsoleError`] describing what is wrong with the line.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(ConsoleCommand::Nothing);
    };
    let args: Vec<&str> = words.collect();
    let dispatch = |intents: Vec<UiIntent>| -> Result<ConsoleCommand, ConsoleError> {
        Ok(ConsoleCommand::Dispatch(intents))
    };

    match command.to_ascii_lowercase().as_str() {
        "select" => {
            let serial = args.first().ok_or(ConsoleError::MissingArgument {
                command: "select",
                argument: "a serial",
            })?;
            dispatch(vec![UiIntent::DeviceSelected {
                serial: (*serial).to_string(),
            }])
        }
        "flip" => {
            let value = args.first().ok_or(ConsoleError::MissingArgument {
                command: "flip",
                argument: "`on` or `off`",
            })?;
            let flip = match value.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                other => return Err(ConsoleError::InvalidToggle(other.to_string())),
            };
            dispatch(vec![UiIntent::FlipToggled { flip }])
        }
        "auto" => dispatch(vec![UiIntent::AutomationToggled]),
        "tap" => {
            let (x, y) = point("tap", &args)?;
            dispatch(vec![
                UiIntent::Pointer {
                    x,
                    y,
                    phase: ActionPhase::Down,
                },
                UiIntent::Pointer {
                    x,
                    y,
                    phase: ActionPhase::Up,
                },
            ])
        }
        "down" | "move" | "up" => {
            let (phase, name) = match command.to_ascii_lowercase().as_str() {
                "down" => (ActionPhase::Down, "down"),
                "move" => (ActionPhase::Move, "move"),
                _ => (ActionPhase::Up, "up"),
            };
            let (x, y) = point(name, &args)?;
            dispatch(vec![UiIntent::Pointer { x, y, phase }])
        }
        "key" => {
            let value = args.first().ok_or(ConsoleError::MissingArgument {
                command: "key",
                argument: "a character or key code",
            })?;
            let code = key_code(value)?;
            dispatch(vec![
                UiIntent::Key {
                    code,
                    phase: ActionPhase::Down,
                },
                UiIntent::Key {
                    code,
                    phase: ActionPhase::Up,
                },
            ])
        }
        "home" => dispatch(vec![UiIntent::HomePressed]),
        "back" => dispatch(vec![UiIntent::BackPressed]),
        "devices" => Ok(ConsoleCommand::Devices),
        "status" => Ok(ConsoleCommand::Status),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        _ => Err(ConsoleError::UnknownCommand(command.to_string())),
    }
}

fn point(command: &'static str, args: &[&str]) -> Result<(f64, f64), ConsoleError> {
    let [x, y] = args else {
        return Err(ConsoleError::MissingArgument {
            command,
            argument: "an x and a y coordinate",
        });
    };
    Ok((number(x)?, number(y)?))
}

fn number(value: &str) -> Result<f64, ConsoleError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConsoleError::InvalidNumber(value.to_string()))
}

/// A single character maps to its code point; anything longer must be a
/// decimal or `0x` hexadecimal host key code.
fn key_code(value: &str) -> Result<i32, ConsoleError> {
    let mut chars = value.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(c as i32);
    }
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => i32::from_str_radix(hex, 16),
        None => value.parse::<i32>(),
    };
    parsed.map_err(|_| ConsoleError::InvalidNumber(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_is_nothing() {
        assert_eq!(parse_command("   "), Ok(ConsoleCommand::Nothing));
    }

    #[test]
    fn test_select_builds_device_selected_intent() {
        assert_eq!(
            parse_command("select ABC123"),
            Ok(ConsoleCommand::Dispatch(vec![UiIntent::DeviceSelected {
                serial: "ABC123".to_string()
            }]))
        );
        assert!(matches!(
            parse_command("select"),
            Err(ConsoleError::MissingArgument { command: "select", .. })
        ));
    }

    #[test]
    fn test_tap_expands_to_down_and_up() {
        // Act
        let parsed = parse_command("tap 100 400.5");

        // Assert
        let Ok(ConsoleCommand::Dispatch(intents)) = parsed else {
            panic!("expected dispatch, got {parsed:?}");
        };
        assert_eq!(intents.len(), 2);
        assert_eq!(
            intents[0],
            UiIntent::Pointer {
                x: 100.0,
                y: 400.5,
                phase: ActionPhase::Down
            }
        );
        assert!(matches!(intents[1], UiIntent::Pointer { phase: ActionPhase::Up, .. }));
    }

    #[test]
    fn test_flip_accepts_on_and_off_only() {
        assert_eq!(
            parse_command("flip ON"),
            Ok(ConsoleCommand::Dispatch(vec![UiIntent::FlipToggled { flip: true }]))
        );
        assert_eq!(
            parse_command("flip maybe"),
            Err(ConsoleError::InvalidToggle("maybe".to_string()))
        );
    }

    #[test]
    fn test_key_accepts_character_decimal_and_hex() {
        let first_code = |line: &str| match parse_command(line) {
            Ok(ConsoleCommand::Dispatch(intents)) => match intents.first() {
                Some(UiIntent::Key { code, .. }) => Some(*code),
                _ => None,
            },
            _ => None,
        };

        assert_eq!(first_code("key a"), Some('a' as i32));
        assert_eq!(first_code("key 32"), Some(32));
        assert_eq!(first_code("key 0x01000004"), Some(0x0100_0004));
        assert_eq!(
            parse_command("key enter"),
            Err(ConsoleError::InvalidNumber("enter".to_string()))
        );
    }

    #[test]
    fn test_bad_coordinates_are_rejected() {
        assert_eq!(
            parse_command("move 1 nope"),
            Err(ConsoleError::InvalidNumber("nope".to_string()))
        );
        assert!(matches!(
            parse_command("down 1"),
            Err(ConsoleError::MissingArgument { command: "down", .. })
        ));
    }

    #[test]
    fn test_unknown_command_is_reported() {
        assert_eq!(
            parse_command("reboot"),
            Err(ConsoleError::UnknownCommand("reboot".to_string()))
        );
        assert_eq!(parse_command("QUIT"), Ok(ConsoleCommand::Quit));
    }
}
