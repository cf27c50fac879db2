//! Session identity, lifecycle state, and the flags shared with workers.
//!
//! # Session lifecycle
//!
//! ```text
//!            select                 initialized
//!   Idle ───────────►  Connecting  ─────────────►  Connected
//!    ▲                     │                          │
//!    │                     └───────────┬──────────────┘
//!    │                                 │ switch / stop / close
//!    └────────────────────  Stopping ◄─┘
//!
//!   Connecting / Connected ── start() returns or fails ──► Disconnected
//! ```
//!
//! `Disconnected` is terminal for that session.  The controller does not
//! retry; the user picks a device again.
//!
//! # Shared flags
//!
//! [`SessionFlags`] bundles the three booleans worker threads observe
//! (running, alive, flip).  Workers only read them, except for the
//! automation escalation path which clears `alive`.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of one session instance.
///
/// A new id is generated on every device selection, so events raised by a
/// connection that has already been torn down can be recognised and dropped.
pub type SessionId = Uuid;

/// Lifecycle state of the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No session.
    Idle,
    /// Transport `start()` is running; the initial lifecycle event has not
    /// arrived yet.
    Connecting,
    /// The transport reported its resolution; frames are flowing.
    Connected,
    /// Teardown in progress.
    Stopping,
    /// The connection failed or ended on its own.
    Disconnected,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Stopping => "stopping",
            SessionState::Disconnected => "disconnected",
        }
    }
}

/// Width and height of the device screen in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The larger of the two dimensions.
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Flags shared between the session controller and its workers.
#[derive(Debug, Default)]
pub struct SessionFlags {
    running: AtomicBool,
    alive: AtomicBool,
    flip: AtomicBool,
}

impl SessionFlags {
    /// Creates flags for a fresh session: alive, automation off.
    pub fn new(flip: bool) -> Self {
        Self {
            running: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            flip: AtomicBool::new(flip),
        }
    }

    /// Automation enabled.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::Release);
    }

    /// Atomically toggles `running`, returning the new value.
    pub fn toggle_running(&self) -> bool {
        !self.running.fetch_xor(true, Ordering::AcqRel)
    }

    /// Connection healthy.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, value: bool) {
        self.alive.store(value, Ordering::Release);
    }

    /// Frames are mirrored horizontally.
    pub fn is_flipped(&self) -> bool {
        self.flip.load(Ordering::Relaxed)
    }

    pub fn set_flip(&self, value: bool) {
        self.flip.store(value, Ordering::Relaxed);
    }
}
