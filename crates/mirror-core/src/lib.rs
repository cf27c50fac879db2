//! # mirror-core
//!
//! Shared library for DroidMirror containing the domain entities, the
//! host-to-Android key translation table, the `adb devices` listing parser,
//! and the small concurrency primitives the session pipeline is built from.
//!
//! It has zero dependencies on OS APIs, subprocesses, or UI frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! DroidMirror mirrors the screen of an Android device onto the host and
//! forwards keyboard and mouse input back to the device.  The device is
//! reached through `adb` (the Android Debug Bridge).
//!
//! This crate (`mirror-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Devices, frames, control actions, and the per-session
//!   flags (running, alive, flip) that worker threads observe.
//!
//! - **`keymap`** – Translation from host key codes to Android `KEYCODE_*`
//!   values.
//!
//! - **`listing`** – Parsing of the line-oriented `adb devices -l` output.
//!
//! - **`pipeline`** – The latest-wins [`FrameChannel`], the typed
//!   [`EventBus`], and the frame [`SequenceCounter`].

pub mod domain;
pub mod keymap;
pub mod listing;
pub mod pipeline;

// Re-export the most-used types at the crate root so callers can write
// `mirror_core::Frame` instead of `mirror_core::domain::frame::Frame`.
pub use domain::control::{ActionPhase, ControlAction};
pub use domain::device::{Device, DeviceStatus, PLACEHOLDER_SERIAL};
pub use domain::frame::{Frame, FrameError, PixelFormat};
pub use domain::session::{Resolution, SessionFlags, SessionId, SessionState};
pub use keymap::android::KeyCode;
pub use keymap::KeyMapper;
pub use pipeline::event_bus::{EventBus, SubscriptionId};
pub use pipeline::frame_channel::FrameChannel;
pub use pipeline::sequence::SequenceCounter;
