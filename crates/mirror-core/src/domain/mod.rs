//! Domain entities for DroidMirror.
//!
//! This module contains pure data types with no infrastructure dependencies.
//! Code in outer layers (application, infrastructure, presentation) depends
//! on the domain, but the domain never depends on them.

/// Control actions sent to the device (touch and key events).
pub mod control;
/// Devices as reported by the device bridge.
pub mod device;
/// Decoded video frames.
pub mod frame;
/// Session identity, lifecycle state, and shared flags.
pub mod session;
