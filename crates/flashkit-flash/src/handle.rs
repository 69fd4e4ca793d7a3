//! ProgrammerHandle - owning wrapper around a programmer
//!
//! The handle owns the type-erased programmer and guarantees the session is
//! closed when it goes out of scope, on every exit path including unwinding.

use std::path::Path;

use flashkit_core::probe::ProbeInfo;
use flashkit_core::programmer::{Programmer, RttControl};

use crate::error::Result;
use crate::registry;

/// Owning programmer handle
///
/// Implements [`Programmer`] by delegation and calls
/// [`Programmer::disconnect`] on drop.
pub struct ProgrammerHandle {
    inner: Box<dyn Programmer>,
}

impl ProgrammerHandle {
    /// Wrap a programmer
    pub fn new(inner: Box<dyn Programmer>) -> Self {
        Self { inner }
    }

    /// All probes `programmer` can currently reach
    pub fn connected_probes(programmer: &str) -> Result<Vec<ProbeInfo>> {
        registry::list_probes(programmer)
    }

    /// The first probe `programmer` can reach
    pub fn first_available(programmer: &str) -> Result<Option<ProbeInfo>> {
        Ok(Self::connected_probes(programmer)?.into_iter().next())
    }

    /// The probe with `serial`, if attached
    pub fn find_by_serial(programmer: &str, serial: u32) -> Result<Option<ProbeInfo>> {
        Ok(Self::connected_probes(programmer)?
            .into_iter()
            .find(|p| p.serial == Some(serial)))
    }

    /// Print attached probes to stdout, returning them
    pub fn print_connected(programmer: &str) -> Result<Vec<ProbeInfo>> {
        let probes = Self::connected_probes(programmer)?;
        if probes.is_empty() {
            println!("No {} devices found", programmer);
        } else {
            println!("Found {} {} device(s):", probes.len(), programmer);
            for (i, probe) in probes.iter().enumerate() {
                println!("  {}. {}", i + 1, probe);
            }
        }
        Ok(probes)
    }
}

impl Programmer for ProgrammerHandle {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn serial(&self) -> Option<u32> {
        self.inner.serial()
    }

    fn probe(&self) -> bool {
        self.inner.probe()
    }

    fn connect(&mut self, target: Option<&str>) -> bool {
        self.inner.connect(target)
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn target(&self) -> Option<&str> {
        self.inner.target()
    }

    fn flash(&mut self, path: &Path, verify: bool, reset_after: bool) -> bool {
        self.inner.flash(path, verify, reset_after)
    }

    fn reset(&mut self, halt: bool) {
        self.inner.reset(halt)
    }

    fn disconnect(&mut self) {
        self.inner.disconnect()
    }

    fn read_memory(&mut self, address: u32, length: usize) -> Option<Vec<u8>> {
        self.inner.read_memory(address, length)
    }

    fn as_rtt(&mut self) -> Option<&mut dyn RttControl> {
        self.inner.as_rtt()
    }
}

impl Drop for ProgrammerHandle {
    fn drop(&mut self) {
        self.inner.disconnect();
    }
}
