//! TOML-based configuration persistence for the host application.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DroidMirror\config.toml`
//! - Linux:    `~/.config/droidmirror/config.toml`
//! - macOS:    `~/Library/Application Support/DroidMirror/config.toml`
//!
//! Example:
//!
//! ```toml
//! [display]
//! max_width = 800
//!
//! [session]
//! encoder_name = "OMX.qcom.video.encoder.avc"
//! flip = false
//!
//! [discovery]
//! adb_path = "/opt/android-sdk/platform-tools/adb"
//!
//! [automation]
//! tap_x = 300
//! tap_y = 1000
//! ```
//!
//! # Serde default values
//!
//! Every section and every field has a default, so a partial file (or no
//! file at all on first run) still yields a complete configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::automation::{AutomationSettings, EscalationPolicy, FixedTap};
use crate::application::control_session::ControllerSettings;
use crate::application::transport::ConnectOptions;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How mirrored frames are displayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Longest side of the displayed frame in pixels.  Pointer positions are
    /// scaled against this value.
    #[serde(default = "default_max_width")]
    pub max_width: u32,
}

/// Per-session connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Requested video bitrate in bits per second.
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
    /// Device encoder to request.  Omitted lets the device choose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder_name: Option<String>,
    /// Mirror frames horizontally.
    #[serde(default)]
    pub flip: bool,
    /// Pause between frame grabs for polling transports.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

/// Device discovery and the `adb` executable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// Run the registry poll and reconnect loops.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path to `adb`; a bare name is looked up on `PATH`.
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    /// Time budget for one `adb` command.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

/// Automation cadence and script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutomationConfig {
    #[serde(default = "default_automation_interval_ms")]
    pub interval_ms: u64,
    /// Device coordinate tapped on every step.
    #[serde(default = "default_tap_x")]
    pub tap_x: i32,
    #[serde(default = "default_tap_y")]
    pub tap_y: i32,
    /// Tear the session down when an automated action fails.  When `false`
    /// only automation is switched off.
    #[serde(default = "default_true")]
    pub escalate_on_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_max_width() -> u32 {
    800
}
fn default_bitrate() -> u32 {
    1_000_000_000
}
fn default_frame_interval_ms() -> u64 {
    100
}
fn default_true() -> bool {
    true
}
fn default_adb_path() -> String {
    "adb".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_reconnect_interval_ms() -> u64 {
    2000
}
fn default_command_timeout_ms() -> u64 {
    3000
}
fn default_automation_interval_ms() -> u64 {
    2000
}
fn default_tap_x() -> i32 {
    300
}
fn default_tap_y() -> i32 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bitrate: default_bitrate(),
            encoder_name: None,
            flip: false,
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            adb_path: default_adb_path(),
            poll_interval_ms: default_poll_interval_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_automation_interval_ms(),
            tap_x: default_tap_x(),
            tap_y: default_tap_y(),
            escalate_on_failure: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Conversion into application settings ─────────────────────────────────────

impl AppConfig {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            max_width: self.display.max_width,
            bitrate: self.session.bitrate,
            encoder_name: self.session.encoder_name.clone(),
            frame_interval: Duration::from_millis(self.session.frame_interval_ms),
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        let policy = if self.automation.escalate_on_failure {
            EscalationPolicy::TearDownSession
        } else {
            EscalationPolicy::DisableOnly
        };
        ControllerSettings {
            connect: self.connect_options(),
            flip: self.session.flip,
            automation: AutomationSettings {
                interval: Duration::from_millis(self.automation.interval_ms),
                policy,
            },
        }
    }

    pub fn fixed_tap(&self) -> FixedTap {
        FixedTap {
            x: self.automation.tap_x,
            y: self.automation.tap_y,
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery.command_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.discovery.poll_interval_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.discovery.reconnect_interval_ms)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `DroidMirror`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DroidMirror"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("droidmirror"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DroidMirror")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("droidmirror-test-{tag}-{}", uuid::Uuid::new_v4()))
            .join("config.toml")
    }

    // ── AppConfig defaults ────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_matches_documented_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.display.max_width, 800);
        assert_eq!(cfg.session.bitrate, 1_000_000_000);
        assert_eq!(cfg.session.encoder_name, None);
        assert!(!cfg.session.flip);
        assert_eq!(cfg.discovery.poll_interval_ms, 1000);
        assert_eq!(cfg.discovery.reconnect_interval_ms, 2000);
        assert_eq!(cfg.discovery.command_timeout_ms, 3000);
        assert_eq!(cfg.automation.interval_ms, 2000);
        assert_eq!(cfg.logging.log_level, "info");
    }

    #[test]
    fn test_default_controller_settings_match_application_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.controller_settings(), ControllerSettings::default());
        assert_eq!(cfg.fixed_tap(), FixedTap::default());
    }

    #[test]
    fn test_escalate_on_failure_false_selects_disable_only() {
        let mut cfg = AppConfig::default();
        cfg.automation.escalate_on_failure = false;
        assert_eq!(
            cfg.controller_settings().automation.policy,
            EscalationPolicy::DisableOnly
        );
    }

    // ── TOML round-trip ───────────────────────────────────────────────────────

    #[test]
    fn test_app_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.display.max_width = 1024;
        cfg.session.encoder_name = Some("c2.android.avc.encoder".to_string());
        cfg.discovery.adb_path = "/usr/bin/adb".to_string();

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_absent_encoder_is_omitted_from_toml() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        assert!(!toml_str.contains("encoder_name"));
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_section_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[discovery]
enabled = false

[automation]
tap_x = 540
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert!(!cfg.discovery.enabled);
        assert_eq!(cfg.automation.tap_x, 540);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.automation.tap_y, 1000);
        assert_eq!(cfg.discovery.adb_path, "adb");
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    // ── File repository ───────────────────────────────────────────────────────

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = temp_config_path("missing");
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_restores_config() {
        // Arrange
        let path = temp_config_path("save");
        let mut cfg = AppConfig::default();
        cfg.session.flip = true;

        // Act
        save_config_to(&cfg, &path).expect("save succeeds");
        let restored = load_config_from(&path).expect("load succeeds");

        // Assert
        assert_eq!(restored, cfg);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_load_malformed_file_returns_parse_error() {
        let path = temp_config_path("malformed");
        save_config_to(&AppConfig::default(), &path).expect("save succeeds");
        std::fs::write(&path, "[display\nmax_width = ").expect("overwrite");

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
