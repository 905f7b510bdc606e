//! Error types for fwflasher-core

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::image::ImageRole;

/// Core errors
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The host refused to list serial ports
    #[error("Serial port enumeration failed: {0}")]
    Enumeration(#[from] serialport::Error),

    /// The image directory could not be created or listed
    #[error("Failed to prepare image directory '{path}': {source}")]
    ImageDirectory {
        /// Directory as configured
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Chip id with no entry in the offset table
    #[error("Unknown chip '{0}' (see `fwflasher chips`)")]
    UnknownChip(String),

    /// Config file parse error
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config serialization error
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Config file not found at an explicitly requested path
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Config parsed but holds an unusable value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Reasons a flash submission is refused before anything is launched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// No serial port chosen
    #[error("No serial port selected")]
    MissingPort,

    /// A required image role has no file chosen
    #[error("No {0} image selected; all binary files and a port must be selected")]
    MissingImage(ImageRole),

    /// The chosen port is not in the current snapshot
    #[error("Serial port {0} is not currently attached")]
    UnknownPort(String),

    /// Another flash job holds the active slot
    #[error("Flash job #{0} is already running")]
    JobActive(u64),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
