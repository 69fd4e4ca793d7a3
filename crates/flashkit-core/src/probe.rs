//! Debug probe metadata returned by enumeration

use std::fmt;

/// Probe family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// SEGGER J-Link
    JLink,
    /// Simulated probe
    Dummy,
}

impl ProbeKind {
    /// Short name used on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeKind::JLink => "jlink",
            ProbeKind::Dummy => "dummy",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the host reaches the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connection {
    /// USB attached
    Usb,
    /// Reached over the network
    Ip,
}

/// A debug probe found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInfo {
    /// Probe-assigned serial number
    pub serial: Option<u32>,
    /// Product name, if the probe reports one
    pub product: Option<String>,
    /// Probe family
    pub kind: ProbeKind,
    /// How the probe is attached
    pub connection: Connection,
}

impl ProbeInfo {
    /// Create a USB-attached probe entry
    pub fn new(kind: ProbeKind, serial: Option<u32>, product: Option<String>) -> Self {
        Self {
            serial,
            product,
            kind,
            connection: Connection::Usb,
        }
    }
}

impl fmt::Display for ProbeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.serial {
            Some(sn) => write!(f, "Serial: {}", sn)?,
            None => write!(f, "Serial: <none>")?,
        }
        if let Some(product) = &self.product {
            write!(f, ", Product: {}", product)?;
        }
        if self.connection == Connection::Ip {
            write!(f, " (IP)")?;
        }
        Ok(())
    }
}
