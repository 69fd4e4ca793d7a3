//! Error types for flash orchestration

use std::path::PathBuf;

use flashkit_core::error::Error as CoreError;
use thiserror::Error;

/// Errors reported by the registry and the flash orchestrator
#[derive(Debug, Error)]
pub enum FlashError {
    /// Programmer name not recognised or not compiled in
    #[error("Unsupported programmer: {name}. Currently supported: {supported}")]
    UnknownProgrammer {
        /// Name as given
        name: String,
        /// Compiled-in programmer names
        supported: String,
    },

    /// Auto-selection found nothing
    #[error("No {programmer} devices found. Please connect a {programmer} or specify serial number.")]
    NoProbes {
        /// Programmer name
        programmer: String,
    },

    /// The selected probe is not enumerable
    #[error("{programmer} with serial {} not found or not accessible", display_serial(*serial))]
    ProbeUnavailable {
        /// Programmer name
        programmer: String,
        /// Requested serial
        serial: Option<u32>,
    },

    /// Connecting to the target failed
    #[error("Failed to connect to device")]
    ConnectFailed,

    /// The flash operation reported failure
    #[error("Flash operation failed")]
    FlashFailed,

    /// The firmware image does not exist
    #[error("Firmware file not found: {}", .0.display())]
    FirmwareNotFound(PathBuf),

    /// A programmer parameter is malformed
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The programmer has no RTT capability
    #[error("{0} does not support RTT")]
    RttUnsupported(String),

    /// Transport-level error while opening or enumerating
    #[error(transparent)]
    Transport(#[from] CoreError),
}

fn display_serial(serial: Option<u32>) -> String {
    match serial {
        Some(sn) => sn.to_string(),
        None => "<any>".to_string(),
    }
}

/// Result type for flash orchestration
pub type Result<T> = std::result::Result<T, FlashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = FlashError::NoProbes {
            programmer: "jlink".into(),
        };
        assert_eq!(
            e.to_string(),
            "No jlink devices found. Please connect a jlink or specify serial number."
        );

        let e = FlashError::ProbeUnavailable {
            programmer: "jlink".into(),
            serial: Some(42),
        };
        assert_eq!(e.to_string(), "jlink with serial 42 not found or not accessible");

        let e = FlashError::FirmwareNotFound(PathBuf::from("/tmp/missing.hex"));
        assert_eq!(e.to_string(), "Firmware file not found: /tmp/missing.hex");
    }

    #[test]
    fn test_transport_is_transparent() {
        let e: FlashError = CoreError::NotOpen.into();
        assert_eq!(e.to_string(), "debug probe is not open");
    }
}
