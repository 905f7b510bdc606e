//! fwflasher-core - Core data model for serial firmware flashing
//!
//! This crate holds everything that does not need a background thread:
//!
//! - Serial port snapshots ([`Port`], [`PortSet`]) and the [`DeviceRegistry`]
//!   that produces them
//! - Firmware image roles and the directory-backed [`BinaryCatalog`]
//! - Chip targets with their fixed flash offset tables
//! - Validation of a [`FlashSelection`] and construction of the esptool
//!   argument vector
//! - The TOML configuration file
//!
//! The threaded runtime (port watcher, flash jobs, orchestration) lives in
//! `fwflasher-flash`.
//!
//! # Example
//!
//! ```ignore
//! use fwflasher_core::{BinaryCatalog, Classifier, ImageRole};
//!
//! let mut catalog = BinaryCatalog::new("bin", "bin", Classifier::default());
//! let snapshot = catalog.scan()?;
//! for entry in snapshot.entries(ImageRole::Bootloader) {
//!     println!("{}", entry.path.display());
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod args;
pub mod catalog;
pub mod config;
pub mod error;
pub mod image;
pub mod port;
pub mod registry;
pub mod selection;
pub mod target;

pub use args::build_args;
pub use catalog::{BinaryCatalog, Catalog, RoleSelection};
pub use config::{CatalogSettings, Config, ToolCommand, WatcherSettings};
pub use error::{Error, Result, SelectionError};
pub use image::{BinaryEntry, Classifier, ImageRole};
pub use port::{Port, PortSet};
pub use registry::{DeviceRegistry, SerialRegistry};
pub use selection::{FlashPlan, FlashSelection};
pub use target::{find_chip, ChipInfo, ChipTarget, FlashLayout, CHIPS};
