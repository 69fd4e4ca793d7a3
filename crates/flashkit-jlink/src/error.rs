//! Error types for J-Link operations

use std::path::PathBuf;

use flashkit_core::error::Error as CoreError;
use thiserror::Error;

/// J-Link specific errors
#[derive(Debug, Error)]
pub enum JLinkError {
    /// None of the candidate library locations could be loaded
    #[error("J-Link library not found (tried: {tried}). Install the SEGGER J-Link software or pass lib=<path>")]
    LibraryNotFound {
        /// Candidate paths, comma separated
        tried: String,
    },

    /// The library exists but failed to load
    #[error("Failed to load {}: {source}", path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// The library lacks a required entry point
    #[error("J-Link library has no symbol {name}: {source}")]
    MissingSymbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for J-Link operations
pub type Result<T> = std::result::Result<T, JLinkError>;

impl From<JLinkError> for CoreError {
    fn from(e: JLinkError) -> Self {
        match e {
            JLinkError::InvalidParameter(msg) => CoreError::InvalidParameter(msg),
            other => CoreError::Library(other.to_string()),
        }
    }
}
