//! Transport abstractions the application layer depends on.
//!
//! The session core never talks to `adb` directly.  It sees the device bridge
//! through three traits:
//!
//! - [`DeviceBridge`] – short, async, process-level commands: list devices,
//!   disconnect, connect.  Used by discovery and the reconnector.
//! - [`DeviceConnector`] – builds a [`DeviceConnection`] for one serial.
//! - [`DeviceConnection`] – one live mirroring connection.  [`start`] blocks
//!   the calling thread for the whole life of the connection, so the session
//!   controller always runs it on a dedicated worker.
//!
//! Infrastructure implementations shell out to `adb`; test implementations
//! record calls.
//!
//! [`start`]: DeviceConnection::start

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mirror_core::{ControlAction, EventBus, Frame, Resolution};
use thiserror::Error;

/// Error type for device bridge and connection operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The bridge executable could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A bridge command did not finish within its time budget.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// A bridge command ran but reported failure.
    #[error("`{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// An I/O error occurred while talking to the bridge process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection has been stopped.
    #[error("connection closed")]
    Closed,

    /// The bridge produced output that could not be interpreted.
    #[error("unexpected bridge output: {0}")]
    Protocol(String),
}

/// Process-level device bridge commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Returns the raw `devices -l` listing.
    async fn devices_listing(&self) -> Result<String, TransportError>;

    /// Drops the bridge's link to `serial`.
    async fn disconnect(&self, serial: &str) -> Result<(), TransportError>;

    /// Re-establishes the bridge's link to `serial`.
    async fn connect(&self, serial: &str) -> Result<(), TransportError>;
}

/// Options passed to [`DeviceConnector::connect`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    /// Longest side of the frames delivered to the display, in pixels.
    pub max_width: u32,
    /// Requested video bitrate in bits per second.
    pub bitrate: u32,
    /// Specific encoder to request; `None` lets the device choose.
    pub encoder_name: Option<String>,
    /// Pause between two frame grabs for transports that poll.
    pub frame_interval: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_width: 800,
            bitrate: 1_000_000_000,
            encoder_name: None,
            frame_interval: Duration::from_millis(100),
        }
    }
}

/// Events raised by a [`DeviceConnection`] on its own worker thread.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The handshake completed.  Raised once, before the first frame.
    Initialized {
        device_name: String,
        resolution: Resolution,
    },
    /// A new decoded frame is available.
    FrameReceived(Frame),
}

/// One live mirroring connection to a device.
pub trait DeviceConnection: Send + Sync {
    /// Runs the connection until it is stopped or fails.
    ///
    /// Blocks the calling thread.  Returns `Ok(())` when the connection ends
    /// normally (including after [`stop`](Self::stop)).
    fn start(&self) -> Result<(), TransportError>;

    /// Asks a running [`start`](Self::start) to return.  Idempotent.
    fn stop(&self);

    /// Lifecycle and frame events of this connection.
    fn events(&self) -> &EventBus<ConnectionEvent>;

    /// Sends one control action.
    ///
    /// Implementations serialise concurrent callers.
    fn send_control(&self, action: ControlAction) -> Result<(), TransportError>;
}

/// Creates connections for a given device serial.
pub trait DeviceConnector: Send + Sync {
    /// Builds a connection for `serial`.  Must not block on device I/O; the
    /// handshake happens in [`DeviceConnection::start`].
    fn connect(
        &self,
        serial: &str,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn DeviceConnection>, TransportError>;
}
