//! `adb` adapters for the transport traits.
//!
//! - [`AdbCli`] implements the async [`DeviceBridge`] by running the `adb`
//!   executable: `devices -l`, `disconnect <serial>`, `connect <serial>`.
//!   Every command is bounded by a timeout and killed when it overruns.
//! - [`shell_connection`] implements [`DeviceConnector`] with plain
//!   `adb shell` commands.
//! - [`mock`] provides recording fakes for tests.
//!
//! [`DeviceConnector`]: crate::application::transport::DeviceConnector

pub mod mock;
pub mod process;
pub mod shell_connection;

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::application::transport::{DeviceBridge, TransportError};

/// Default time budget for a single bridge command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(3);

/// Markers `adb connect` prints on failure while still exiting with 0.
const CONNECT_FAILURE_MARKERS: [&str; 3] = ["failed", "cannot", "unable"];

/// [`DeviceBridge`] backed by the `adb` executable.
#[derive(Debug, Clone)]
pub struct AdbCli {
    adb_path: PathBuf,
    timeout: Duration,
}

impl AdbCli {
    pub fn new(adb_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            adb_path: adb_path.into(),
            timeout,
        }
    }

    pub fn adb_path(&self) -> &PathBuf {
        &self.adb_path
    }

    /// Runs `adb <args>` and returns its stdout.
    async fn run(&self, args: &[&str]) -> Result<String, TransportError> {
        let program = self.adb_path.display().to_string();
        let command = process::describe(&program, args);
        debug!(%command, "running bridge command");

        let child = Command::new(&self.adb_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| TransportError::Timeout {
                command: command.clone(),
                timeout: self.timeout,
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                text => text.to_string(),
            };
            return Err(TransportError::CommandFailed { command, detail });
        }
        Ok(stdout)
    }
}

impl Default for AdbCli {
    fn default() -> Self {
        Self::new("adb", DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl DeviceBridge for AdbCli {
    async fn devices_listing(&self) -> Result<String, TransportError> {
        self.run(&["devices", "-l"]).await
    }

    async fn disconnect(&self, serial: &str) -> Result<(), TransportError> {
        self.run(&["disconnect", serial]).await.map(|_| ())
    }

    async fn connect(&self, serial: &str) -> Result<(), TransportError> {
        let stdout = self.run(&["connect", serial]).await?;
        if connect_reported_failure(&stdout) {
            return Err(TransportError::CommandFailed {
                command: format!("adb connect {serial}"),
                detail: stdout.trim().to_string(),
            });
        }
        Ok(())
    }
}

fn connect_reported_failure(stdout: &str) -> bool {
    let lower = stdout.to_ascii_lowercase();
    CONNECT_FAILURE_MARKERS.iter().any(|m| lower.contains(m))
}
