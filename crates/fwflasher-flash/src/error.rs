//! Error types for the orchestration runtime

use std::io;
use thiserror::Error;

use fwflasher_core::SelectionError;

/// Runtime errors
#[derive(Debug, Error)]
pub enum Error {
    /// Submission refused before launch
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Core error (catalog, config, argument building)
    #[error(transparent)]
    Core(#[from] fwflasher_core::Error),

    /// A worker thread could not be started
    #[error("Failed to start {what} thread: {source}")]
    Thread {
        what: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, Error>;
