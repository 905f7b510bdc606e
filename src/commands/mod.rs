//! CLI command implementations
//!
//! Commands that only need a snapshot (`ports`, `list`, `chips`) use
//! `fwflasher-core` directly. `watch` and `flash` go through the threaded
//! runtime in `fwflasher-flash`.

pub mod catalog;
pub mod chips;
pub mod config;
pub mod flash;
pub mod ports;
