//! Infrastructure layer for the host application.
//!
//! Contains OS-facing adapters: the `adb` subprocess bridge and transport,
//! the periodic discovery tasks, file-system storage, and the presentation
//! bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `mirror_core`, but MUST NOT be imported by the `application` or domain
//! layers.  The one exception is the always-compiled `adb::mock` module,
//! which application unit tests use as a fake transport.

pub mod adb;
pub mod discovery;
pub mod storage;
pub mod ui_bridge;
