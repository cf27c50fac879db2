//! Application layer use cases for the host application.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure types in `mirror_core`) and the infrastructure (subprocesses,
//! files, the console).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "mirror the
//!   device the user just picked and forward their clicks to it").
//! - **Depend on abstractions** (the traits in [`transport`]) rather than on
//!   `adb` itself, so tests can drive every use case with fakes.
//! - **Contain no process spawning and no file system access**.
//!
//! # Sub-modules
//!
//! - **`transport`**       – The `DeviceBridge`, `DeviceConnector`, and
//!   `DeviceConnection` traits plus their shared error type.
//!
//! - **`manage_devices`**  – The device registry and the poller that keeps it
//!   in sync with the bridge's device listing.
//!
//! - **`reconnect`**       – Bounces devices that the bridge reports as
//!   offline.
//!
//! - **`control_session`** – The session controller: the one place that
//!   owns session state.  Everything the user does ends up here.
//!
//! - **`translate_input`** – Window coordinates and host key codes to device
//!   control actions.
//!
//! - **`automation`**      – The background loop that reacts to frames with
//!   scripted control actions.

pub mod automation;
pub mod control_session;
pub mod manage_devices;
pub mod reconnect;
pub mod translate_input;
pub mod transport;
