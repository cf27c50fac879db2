//! DroidMirror host entry point.
//!
//! Wires the adb adapters, the device registry, the session controller, and
//! the console bridge together, then drives the bridge from stdin until the
//! user quits or presses Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config + apply CLI overrides
//!  └─ DeviceRegistry  <── DevicePoller   (tokio task, every 1 s)
//!  │                      Reconnector    (tokio task, every 2 s)
//!  └─ SessionController ── AdbShellConnector
//!  │       └─ session worker / automation worker (OS threads)
//!  └─ PresentationBridge <── stdin console
//! ```
//!
//! # Two ways to run
//!
//! - Resilient (default): discovery and reconnect loops keep the device list
//!   current; pick a device with `select <serial>`.
//! - Explicit: `--serial ABC123 --no-discovery` mirrors one known device and
//!   never polls `adb devices`.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use mirror_core::Device;
use mirror_host::application::control_session::{SessionController, SessionEvent};
use mirror_host::application::manage_devices::{write_registry, DevicePoller, DeviceRegistry};
use mirror_host::application::reconnect::Reconnector;
use mirror_host::infrastructure::adb::shell_connection::AdbShellConnector;
use mirror_host::infrastructure::adb::AdbCli;
use mirror_host::infrastructure::discovery::{spawn_reconnector, spawn_registry_poll};
use mirror_host::infrastructure::storage::config::{
    load_config, load_config_from, save_config, save_config_to, AppConfig, ConfigError,
};
use mirror_host::infrastructure::ui_bridge::console::{parse_command, ConsoleCommand, HELP};
use mirror_host::infrastructure::ui_bridge::{PresentationBridge, UiIntent};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// DroidMirror: mirror and control an Android device over adb.
///
/// Every flag overrides the matching config file value.
#[derive(Debug, Parser)]
#[command(name = "mirror-host", version)]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, env = "DROIDMIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Device to mirror on startup.
    #[arg(long, env = "DROIDMIRROR_SERIAL")]
    serial: Option<String>,

    /// Longest side of the displayed frame in pixels.
    #[arg(long, env = "DROIDMIRROR_MAX_WIDTH")]
    max_width: Option<u32>,

    /// Device video encoder to request.
    #[arg(long, env = "DROIDMIRROR_ENCODER")]
    encoder: Option<String>,

    /// Do not poll `adb devices` or reconnect offline devices.
    #[arg(long, env = "DROIDMIRROR_NO_DISCOVERY")]
    no_discovery: bool,

    /// Path to the `adb` executable.
    #[arg(long, env = "DROIDMIRROR_ADB")]
    adb: Option<String>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "DROIDMIRROR_LOG_LEVEL")]
    log_level: Option<String>,
}

/// Settings the host starts with once the config file and the CLI flags
/// are merged.
#[derive(Debug)]
struct Launch {
    config: AppConfig,
    /// Explicit `--config` file, if one was given.
    config_path: Option<PathBuf>,
    serial: Option<String>,
    /// The platform has no config directory, so built-in defaults are used.
    defaults_only: bool,
}

impl Cli {
    /// Loads the config file and applies the CLI overrides on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.  A missing platform config directory is not an error.
    fn into_launch(self) -> anyhow::Result<Launch> {
        let (mut config, defaults_only) = match &self.config {
            Some(path) => (
                load_config_from(path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?,
                false,
            ),
            None => platform_config_or_default(load_config())?,
        };

        if let Some(max_width) = self.max_width {
            config.display.max_width = max_width;
        }
        if let Some(encoder) = self.encoder {
            config.session.encoder_name = Some(encoder);
        }
        if self.no_discovery {
            config.discovery.enabled = false;
        }
        if let Some(adb) = self.adb {
            config.discovery.adb_path = adb;
        }
        if let Some(level) = self.log_level {
            config.logging.log_level = level;
        }
        Ok(Launch {
            config,
            config_path: self.config,
            serial: self.serial,
            defaults_only,
        })
    }
}

/// Falls back to the defaults when the platform has no config directory.
/// Every other load failure stays fatal.
fn platform_config_or_default(
    loaded: Result<AppConfig, ConfigError>,
) -> anyhow::Result<(AppConfig, bool)> {
    match loaded {
        Ok(config) => Ok((config, false)),
        Err(ConfigError::NoPlatformConfigDir) => Ok((AppConfig::default(), true)),
        Err(e) => Err(e).context("failed to load config"),
    }
}

/// Stores the flip toggle so the next launch starts with it.  Only the
/// stored file is updated; CLI overrides are not written back.
fn persist_flip(config_path: Option<&Path>, flip: bool) -> Result<(), ConfigError> {
    match config_path {
        Some(path) => {
            let mut stored = load_config_from(path)?;
            stored.session.flip = flip;
            save_config_to(&stored, path)
        }
        None => {
            let mut stored = load_config()?;
            stored.session.flip = flip;
            save_config(&stored)
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let launch = Cli::parse().into_launch()?;
    let config = &launch.config;

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level)),
        )
        .init();

    info!("DroidMirror host starting");
    if launch.defaults_only {
        warn!("no platform config directory found; using default settings");
    }

    let registry = DeviceRegistry::shared();
    let bridge = Arc::new(AdbCli::new(
        config.discovery.adb_path.clone(),
        config.command_timeout(),
    ));
    let connector = Arc::new(AdbShellConnector::new(
        config.discovery.adb_path.clone(),
        config.command_timeout(),
    ));
    let controller = SessionController::with_script(
        Arc::clone(&registry),
        connector,
        config.controller_settings(),
        Arc::new(config.fixed_tap()),
    );
    controller.events().subscribe(log_session_event);

    // Shutdown flag shared across all background services.
    let running = Arc::new(AtomicBool::new(true));

    // ── Discovery ─────────────────────────────────────────────────────────────
    if config.discovery.enabled {
        let poller = DevicePoller::new(bridge.clone(), Arc::clone(&registry));
        if let Err(e) = poller.poll().await {
            warn!(error = %e, "initial device poll failed");
        }
        spawn_registry_poll(poller, config.poll_interval(), Arc::clone(&running));
        spawn_reconnector(
            Reconnector::new(bridge),
            config.reconnect_interval(),
            Arc::clone(&running),
        );
    } else if let Some(serial) = &launch.serial {
        info!(%serial, "discovery disabled, using the given device only");
        write_registry(&registry).reconcile(&[Device::new(serial.clone())]);
    } else {
        warn!("discovery disabled and no --serial given; no device can be selected");
    }

    let ui = PresentationBridge::new(controller.clone(), registry);

    if let Some(serial) = launch.serial.clone() {
        print_json(&ui.dispatch(UiIntent::DeviceSelected { serial }));
    }

    info!("DroidMirror ready.  Type `help` for commands, Ctrl-C to exit.");

    // ── Console loop ──────────────────────────────────────────────────────────
    //
    // Stdin is read on a plain thread: a blocking read cannot be cancelled,
    // and a detached thread does not hold up process exit.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    std::thread::Builder::new()
        .name("mirror-console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn console reader")?;

    loop {
        let line = tokio::select! {
            line = line_rx.recv() => line,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        match parse_command(&line) {
            Ok(ConsoleCommand::Dispatch(intents)) => {
                for intent in intents {
                    if let UiIntent::FlipToggled { flip } = &intent {
                        if let Err(e) = persist_flip(launch.config_path.as_deref(), *flip) {
                            warn!(error = %e, "could not save the flip setting");
                        }
                    }
                    print_json(&ui.dispatch(intent));
                }
            }
            Ok(ConsoleCommand::Devices) => print_json(&ui.devices()),
            Ok(ConsoleCommand::Status) => print_json(&ui.status()),
            Ok(ConsoleCommand::Help) => println!("{HELP}"),
            Ok(ConsoleCommand::Quit) => break,
            Ok(ConsoleCommand::Nothing) => {}
            Err(e) => eprintln!("{e}"),
        }
    }

    running.store(false, Ordering::Relaxed);
    print_json(&ui.dispatch(UiIntent::WindowClosed));
    info!("DroidMirror host stopped");
    Ok(())
}

fn log_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::StateChanged { serial, state } => {
            info!(serial = serial.as_deref().unwrap_or("-"), state = state.as_str(), "session state")
        }
        SessionEvent::Initialized {
            serial,
            device_name,
            resolution,
        } => info!(
            %serial,
            %device_name,
            width = resolution.width,
            height = resolution.height,
            "mirroring"
        ),
        SessionEvent::Frame(frame) => trace!(sequence = frame.sequence(), "frame"),
        SessionEvent::AutomationChanged { running } => info!(running, "automation"),
        SessionEvent::ConnectionLost { serial, message } => {
            error!(%serial, %message, "connection lost")
        }
        SessionEvent::Notice { message } => warn!(%message, "notice"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => debug!(error = %e, "could not render response"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
