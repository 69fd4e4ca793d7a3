//! Error types for flashkit-core
//!
//! Every fallible transport call returns this error. Programmers turn it
//! into a `bool`/`Option` result plus a log line, so it never escapes as a
//! process-fatal condition.

use thiserror::Error;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Library errors
    /// The vendor library could not be loaded or lacks a required symbol
    #[error("debug probe library error: {0}")]
    Library(String),

    // Probe errors
    /// No probe with the requested serial number is attached
    #[error("debug probe {} not found", display_serial(*serial))]
    ProbeNotFound {
        /// Requested serial number, `None` for "any probe"
        serial: Option<u32>,
    },
    /// Opening the probe failed
    #[error("failed to open debug probe: {0}")]
    OpenFailed(String),
    /// The debug interface (SWD/JTAG) could not be selected
    #[error("failed to select debug interface: {0}")]
    InterfaceSelect(String),
    /// Operation requires an open probe
    #[error("debug probe is not open")]
    NotOpen,

    // Target errors
    /// Connecting to the named core or device failed
    #[error("failed to connect to {target}: {reason}")]
    ConnectFailed {
        /// Core or device name the connection was attempted with
        target: String,
        /// Reason reported by the transport
        reason: String,
    },
    /// Reading target memory failed
    #[error("failed to read memory at 0x{address:08X}: {reason}")]
    ReadFailed {
        /// Address of the failed read
        address: u32,
        /// Reason reported by the transport
        reason: String,
    },
    /// Halting the core failed
    #[error("failed to halt core: {0}")]
    HaltFailed(String),
    /// Resetting the target failed
    #[error("failed to reset target: {0}")]
    ResetFailed(String),
    /// The flash call could not be issued
    #[error("flash operation failed: {0}")]
    FlashFailed(String),

    // RTT errors
    /// RTT start/stop/read/write failed
    #[error("RTT error: {0}")]
    Rtt(String),

    // Configuration errors
    /// An option value could not be parsed
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

fn display_serial(serial: Option<u32>) -> String {
    match serial {
        Some(sn) => format!("with serial {}", sn),
        None => "(any)".to_string(),
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_not_found_message() {
        let e = Error::ProbeNotFound { serial: Some(123) };
        assert_eq!(e.to_string(), "debug probe with serial 123 not found");
        let e = Error::ProbeNotFound { serial: None };
        assert_eq!(e.to_string(), "debug probe (any) not found");
    }

    #[test]
    fn test_read_failed_message() {
        let e = Error::ReadFailed {
            address: 0xE004_2000,
            reason: "bus fault".into(),
        };
        assert_eq!(
            e.to_string(),
            "failed to read memory at 0xE0042000: bus fault"
        );
    }
}
