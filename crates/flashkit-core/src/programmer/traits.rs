//! Programmer trait definitions
//!
//! Two layers:
//!
//! - [`DebugTransport`] is the narrow seam towards a vendor debug-probe
//!   library. Every call is fallible and returns a `Result`; nothing here
//!   interprets what a failure means for a flashing run.
//! - [`Programmer`] is the lifecycle contract (probe, connect, flash, reset,
//!   disconnect, read memory) each probe family implements. Its operations
//!   never fail loudly: transport faults become `false`/`None` plus a log
//!   entry.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::probe::ProbeInfo;

/// Debug wire protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interface {
    /// Serial Wire Debug
    #[default]
    Swd,
    /// JTAG
    Jtag,
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interface::Swd => f.write_str("SWD"),
            Interface::Jtag => f.write_str("JTAG"),
        }
    }
}

impl FromStr for Interface {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "swd" => Ok(Interface::Swd),
            "jtag" => Ok(Interface::Jtag),
            _ => Err(Error::InvalidParameter(format!(
                "'{}' is not a valid interface. Choose from [swd, jtag].",
                s
            ))),
        }
    }
}

/// Vendor debug-probe library seam
///
/// Mirrors the calls a vendor library offers: open a probe by serial,
/// select the wire protocol, connect naming a core or device, read target
/// memory, program an image, reset, halt and close, plus the RTT terminal.
///
/// Implementations must report transport faults as `Err` and never panic
/// on them. Reads from an unmapped or unpowered bus region are allowed to
/// return `Ok(0)` or `Ok(0xFFFF_FFFF)`; callers filter those.
pub trait DebugTransport {
    /// Enumerate attached probes of this family
    fn list_probes(&self) -> Result<Vec<ProbeInfo>>;

    /// Open the probe with the given serial (first available if `None`)
    fn open(&mut self, serial: Option<u32>) -> Result<()>;

    /// Returns true while a probe is open
    fn is_open(&self) -> bool;

    /// Select the debug wire protocol
    fn select_interface(&mut self, interface: Interface) -> Result<()>;

    /// Connect to the target, naming a core (`Cortex-M4`) or a device
    /// (`STM32F765ZG`)
    fn connect(&mut self, target: &str) -> Result<()>;

    /// Returns true while a target connection is established
    fn is_connected(&self) -> bool;

    /// Read one 32-bit word of target memory
    fn read_u32(&mut self, address: u32) -> Result<u32>;

    /// Read target memory into `buf`
    fn read_memory(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Returns true if the core is halted
    fn is_halted(&mut self) -> Result<bool>;

    /// Halt the core
    fn halt(&mut self) -> Result<()>;

    /// Program (and verify) an image file at `base_address`
    ///
    /// Returns the vendor result code: negative values signal failure,
    /// non-negative values are vendor specific (usually bytes written).
    /// `Err` is reserved for calls that could not be issued at all.
    fn flash_file(&mut self, path: &Path, base_address: u32) -> Result<i32>;

    /// Reset the target, leaving the core halted if `halt` is set
    fn reset(&mut self, halt: bool) -> Result<()>;

    /// Close the probe; must be safe to call when already closed
    fn close(&mut self);

    /// Start the RTT terminal, optionally at a known control block address
    fn rtt_start(&mut self, _control_block: Option<u32>) -> Result<()> {
        Err(Error::Rtt("RTT is not supported by this probe".into()))
    }

    /// Stop the RTT terminal
    fn rtt_stop(&mut self) -> Result<()> {
        Err(Error::Rtt("RTT is not supported by this probe".into()))
    }

    /// Read pending bytes from an RTT up-channel, returns the count read
    fn rtt_read(&mut self, _channel: u32, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::Rtt("RTT is not supported by this probe".into()))
    }

    /// Write bytes to an RTT down-channel, returns the count accepted
    fn rtt_write(&mut self, _channel: u32, _data: &[u8]) -> Result<usize> {
        Err(Error::Rtt("RTT is not supported by this probe".into()))
    }
}

/// Programmer lifecycle contract
///
/// One implementation exists per debug-probe family. Callers (the flash
/// orchestrator, the CLI) depend only on this trait.
pub trait Programmer {
    /// Programmer name as used on the command line
    fn name(&self) -> &'static str;

    /// Serial number of the probe this programmer is bound to
    fn serial(&self) -> Option<u32>;

    /// Returns true if a matching probe is currently enumerable
    ///
    /// Never mutates connection state.
    fn probe(&self) -> bool;

    /// Open the probe and connect to the target
    ///
    /// With `target` absent the target is identified automatically. Returns
    /// false on any transport failure.
    fn connect(&mut self, target: Option<&str>) -> bool;

    /// Returns true while the session is open
    fn is_connected(&self) -> bool;

    /// Part number (or core name) the session is connected with
    fn target(&self) -> Option<&str>;

    /// Flash a firmware image
    ///
    /// Connects first if needed. The session is always closed afterwards,
    /// whatever the outcome.
    fn flash(&mut self, path: &Path, verify: bool, reset_after: bool) -> bool;

    /// Reset the target; best effort, never fails
    fn reset(&mut self, halt: bool);

    /// Close the session; idempotent
    fn disconnect(&mut self);

    /// Read target memory; `None` if not connected or on any fault
    fn read_memory(&mut self, address: u32, length: usize) -> Option<Vec<u8>>;

    /// RTT capability, if the probe family has one
    fn as_rtt(&mut self) -> Option<&mut dyn RttControl> {
        None
    }
}

/// Real-time transfer capability
pub trait RttControl {
    /// Start RTT and wait `settle` for the target to set up its control block
    fn start_rtt(&mut self, control_block: Option<u32>, settle: Duration) -> bool;

    /// Stop RTT; best effort
    fn stop_rtt(&mut self);

    /// Read up to `max_bytes` from the terminal up-channel
    ///
    /// Returns `Some(empty)` when nothing is pending and `None` on a fault.
    fn rtt_read(&mut self, max_bytes: usize) -> Option<Vec<u8>>;

    /// Write to the terminal down-channel; returns the count accepted
    fn rtt_write(&mut self, data: &[u8]) -> Option<usize>;
}
