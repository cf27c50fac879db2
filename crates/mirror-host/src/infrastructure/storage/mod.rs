//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration file from the
//! platform-appropriate directory, writes it back when asked, and supplies
//! defaults on first run.  It also turns the file's sections into the
//! settings structs the application layer consumes.

pub mod config;
