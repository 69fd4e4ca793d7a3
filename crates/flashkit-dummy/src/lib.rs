//! flashkit-dummy - Simulated debug probe for testing
//!
//! This crate provides a [`DebugTransport`] that emulates a debug probe
//! attached to a Cortex-M target. Register values, which cores answer, the
//! flash result code and failure points are configurable, and every call is
//! recorded so tests can assert on what a programmer actually did.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use flashkit_core::error::{Error, Result};
use flashkit_core::identify::DEFAULT_LIVENESS_ADDRESS;
use flashkit_core::probe::{ProbeInfo, ProbeKind};
use flashkit_core::programmer::{DebugTransport, Interface, DEFAULT_FLASH_BASE};

/// Configuration for the simulated probe and target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Serial numbers of the simulated probes
    pub serials: Vec<u32>,
    /// Product name reported for each probe
    pub product: Option<String>,
    /// Core and device names that answer register reads after connect
    pub live_targets: Vec<String>,
    /// Names for which `connect` fails
    pub refused_targets: Vec<String>,
    /// Word-readable registers of a live target
    pub registers: HashMap<u32, u32>,
    /// Base address of the simulated flash
    pub flash_base: u32,
    /// Size of the simulated flash in bytes
    pub flash_size: usize,
    /// Result code returned by `flash_file`; `None` returns the byte count
    pub flash_result: Option<i32>,
    /// Make `open` fail
    pub fail_open: bool,
    /// Make `reset` fail
    pub fail_reset: bool,
    /// Probe has an RTT terminal
    pub rtt: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self::stm32f765()
    }
}

impl DummyConfig {
    /// An STM32F765 (device id 0x451, revision 0x1001) behind one probe
    pub fn stm32f765() -> Self {
        let mut registers = HashMap::new();
        registers.insert(DEFAULT_LIVENESS_ADDRESS, 0x1001_6451);
        Self {
            serials: vec![123456],
            product: Some("J-Link (simulated)".to_string()),
            live_targets: vec!["Cortex-M7".to_string(), "STM32F765ZG".to_string()],
            refused_targets: Vec::new(),
            registers,
            flash_base: DEFAULT_FLASH_BASE,
            flash_size: 64 * 1024,
            flash_result: None,
            fail_open: false,
            fail_reset: false,
            rtt: true,
        }
    }

    /// A probe with no powered target: every core connects, nothing answers
    pub fn unpowered() -> Self {
        Self {
            live_targets: Vec::new(),
            registers: HashMap::new(),
            ..Self::stm32f765()
        }
    }

    /// Set the probe serial numbers
    pub fn with_serials(mut self, serials: &[u32]) -> Self {
        self.serials = serials.to_vec();
        self
    }

    /// Set a register value
    pub fn with_register(mut self, address: u32, value: u32) -> Self {
        self.registers.insert(address, value);
        self
    }

    /// Add a name for which `connect` fails
    pub fn refuse(mut self, target: &str) -> Self {
        self.refused_targets.push(target.to_string());
        self
    }
}

/// Simulated probe and target
pub struct SimulatedTarget {
    config: DummyConfig,
    flash: Vec<u8>,
    open_serial: Option<u32>,
    interface: Option<Interface>,
    connected: Option<String>,
    halted: bool,
    rtt_running: bool,
    rtt_up: VecDeque<u8>,
    rtt_down: Vec<u8>,
    // Call log
    reads: Vec<u32>,
    connects: Vec<String>,
    flashed: Vec<(PathBuf, u32)>,
    resets: usize,
    closes: usize,
}

impl SimulatedTarget {
    /// Create a simulated target with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let flash = vec![0xFF; config.flash_size];
        Self {
            config,
            flash,
            open_serial: None,
            interface: None,
            connected: None,
            halted: false,
            rtt_running: false,
            rtt_up: VecDeque::new(),
            rtt_down: Vec::new(),
            reads: Vec::new(),
            connects: Vec::new(),
            flashed: Vec::new(),
            resets: 0,
            closes: 0,
        }
    }

    /// Contents of the simulated flash
    pub fn flash_data(&self) -> &[u8] {
        &self.flash
    }

    /// Serial of the open probe
    pub fn open_serial(&self) -> Option<u32> {
        self.open_serial
    }

    /// Selected debug interface
    pub fn interface(&self) -> Option<Interface> {
        self.interface
    }

    /// Every address passed to `read_u32`, in call order
    pub fn reads(&self) -> &[u32] {
        &self.reads
    }

    /// Number of `read_u32` calls for one address
    pub fn reads_of(&self, address: u32) -> usize {
        self.reads.iter().filter(|&&a| a == address).count()
    }

    /// Every name passed to `connect`, in call order
    pub fn connects(&self) -> &[String] {
        &self.connects
    }

    /// Every `(path, base)` passed to `flash_file`
    pub fn flashed(&self) -> &[(PathBuf, u32)] {
        &self.flashed
    }

    /// Number of resets performed
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Number of `close` calls that closed an open probe
    pub fn closes(&self) -> usize {
        self.closes
    }

    /// Returns true while RTT is started
    pub fn rtt_running(&self) -> bool {
        self.rtt_running
    }

    /// Queue bytes the target "prints" on the RTT up-channel
    pub fn push_rtt_output(&mut self, data: &[u8]) {
        self.rtt_up.extend(data);
    }

    /// Bytes written to the RTT down-channel
    pub fn rtt_input(&self) -> &[u8] {
        &self.rtt_down
    }

    fn target_answers(&self) -> bool {
        self.connected
            .as_ref()
            .is_some_and(|t| self.config.live_targets.contains(t))
    }

    fn require_connected(&self) -> Result<()> {
        if self.open_serial.is_none() {
            return Err(Error::NotOpen);
        }
        if self.connected.is_none() {
            return Err(Error::ConnectFailed {
                target: "<none>".into(),
                reason: "not connected".into(),
            });
        }
        Ok(())
    }

    fn require_rtt(&self) -> Result<()> {
        self.require_connected()?;
        if !self.rtt_running {
            return Err(Error::Rtt("RTT not started".into()));
        }
        Ok(())
    }
}

impl DebugTransport for SimulatedTarget {
    fn list_probes(&self) -> Result<Vec<ProbeInfo>> {
        Ok(self
            .config
            .serials
            .iter()
            .map(|&sn| ProbeInfo::new(ProbeKind::Dummy, Some(sn), self.config.product.clone()))
            .collect())
    }

    fn open(&mut self, serial: Option<u32>) -> Result<()> {
        if self.config.fail_open {
            return Err(Error::OpenFailed("simulated open failure".into()));
        }
        let sn = match serial {
            Some(sn) if self.config.serials.contains(&sn) => sn,
            Some(sn) => return Err(Error::ProbeNotFound { serial: Some(sn) }),
            None => *self
                .config
                .serials
                .first()
                .ok_or(Error::ProbeNotFound { serial: None })?,
        };
        log::trace!("dummy: open probe {}", sn);
        self.open_serial = Some(sn);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open_serial.is_some()
    }

    fn select_interface(&mut self, interface: Interface) -> Result<()> {
        if self.open_serial.is_none() {
            return Err(Error::NotOpen);
        }
        self.interface = Some(interface);
        Ok(())
    }

    fn connect(&mut self, target: &str) -> Result<()> {
        if self.open_serial.is_none() {
            return Err(Error::NotOpen);
        }
        self.connects.push(target.to_string());
        if self.config.refused_targets.iter().any(|t| t == target) {
            self.connected = None;
            return Err(Error::ConnectFailed {
                target: target.to_string(),
                reason: "target did not respond".into(),
            });
        }
        log::trace!("dummy: connect {}", target);
        self.connected = Some(target.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open_serial.is_some() && self.connected.is_some()
    }

    fn read_u32(&mut self, address: u32) -> Result<u32> {
        self.require_connected()?;
        self.reads.push(address);
        if !self.target_answers() {
            return Ok(0);
        }
        if let Some(&value) = self.config.registers.get(&address) {
            return Ok(value);
        }
        let mut buf = [0u8; 4];
        self.read_memory(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_memory(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.require_connected()?;
        let offset = address
            .checked_sub(self.config.flash_base)
            .map(|o| o as usize)
            .filter(|&o| o + buf.len() <= self.flash.len())
            .ok_or_else(|| Error::ReadFailed {
                address,
                reason: "bus fault".into(),
            })?;
        buf.copy_from_slice(&self.flash[offset..offset + buf.len()]);
        Ok(())
    }

    fn is_halted(&mut self) -> Result<bool> {
        self.require_connected()?;
        Ok(self.halted)
    }

    fn halt(&mut self) -> Result<()> {
        self.require_connected()?;
        self.halted = true;
        Ok(())
    }

    fn flash_file(&mut self, path: &Path, base_address: u32) -> Result<i32> {
        self.require_connected()?;
        self.flashed.push((path.to_path_buf(), base_address));

        let Ok(image) = fs::read(path) else {
            return Ok(-1);
        };
        let Some(offset) = base_address
            .checked_sub(self.config.flash_base)
            .map(|o| o as usize)
            .filter(|&o| o + image.len() <= self.flash.len())
        else {
            return Ok(-1);
        };
        if let Some(code) = self.config.flash_result {
            return Ok(code);
        }
        self.flash[offset..offset + image.len()].copy_from_slice(&image);
        Ok(image.len() as i32)
    }

    fn reset(&mut self, halt: bool) -> Result<()> {
        self.require_connected()?;
        if self.config.fail_reset {
            return Err(Error::ResetFailed("simulated reset failure".into()));
        }
        self.resets += 1;
        self.halted = halt;
        Ok(())
    }

    fn close(&mut self) {
        if self.open_serial.take().is_some() {
            self.closes += 1;
        }
        self.connected = None;
        self.interface = None;
        self.rtt_running = false;
    }

    fn rtt_start(&mut self, _control_block: Option<u32>) -> Result<()> {
        self.require_connected()?;
        if !self.config.rtt {
            return Err(Error::Rtt("RTT is not supported by this probe".into()));
        }
        self.rtt_running = true;
        Ok(())
    }

    fn rtt_stop(&mut self) -> Result<()> {
        self.require_rtt()?;
        self.rtt_running = false;
        Ok(())
    }

    fn rtt_read(&mut self, _channel: u32, buf: &mut [u8]) -> Result<usize> {
        self.require_rtt()?;
        let n = buf.len().min(self.rtt_up.len());
        for (dst, src) in buf.iter_mut().zip(self.rtt_up.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn rtt_write(&mut self, _channel: u32, data: &[u8]) -> Result<usize> {
        self.require_rtt()?;
        self.rtt_down.extend_from_slice(data);
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(config: DummyConfig, target: &str) -> SimulatedTarget {
        let mut t = SimulatedTarget::new(config);
        t.open(None).unwrap();
        t.select_interface(Interface::Swd).unwrap();
        t.connect(target).unwrap();
        t
    }

    #[test]
    fn test_list_probes() {
        let t = SimulatedTarget::new(DummyConfig::default().with_serials(&[111, 222]));
        let probes = t.list_probes().unwrap();
        assert_eq!(probes.len(), 2);
        assert_eq!(probes[1].serial, Some(222));
        assert_eq!(probes[0].kind, ProbeKind::Dummy);
    }

    #[test]
    fn test_open_by_serial() {
        let mut t = SimulatedTarget::new(DummyConfig::default().with_serials(&[111, 222]));
        assert_eq!(
            t.open(Some(333)),
            Err(Error::ProbeNotFound { serial: Some(333) })
        );
        t.open(Some(222)).unwrap();
        assert_eq!(t.open_serial(), Some(222));
    }

    #[test]
    fn test_live_core_reads_registers() {
        let mut t = connected(DummyConfig::default(), "Cortex-M7");
        assert_eq!(t.read_u32(DEFAULT_LIVENESS_ADDRESS).unwrap(), 0x1001_6451);
        assert_eq!(t.reads_of(DEFAULT_LIVENESS_ADDRESS), 1);
    }

    #[test]
    fn test_dead_core_reads_zero() {
        let mut t = connected(DummyConfig::default(), "Cortex-M0");
        assert_eq!(t.read_u32(DEFAULT_LIVENESS_ADDRESS).unwrap(), 0);
    }

    #[test]
    fn test_refused_connect() {
        let mut t = SimulatedTarget::new(DummyConfig::default().refuse("Cortex-M7"));
        t.open(None).unwrap();
        assert!(t.connect("Cortex-M7").is_err());
        assert!(!t.is_connected());
    }

    #[test]
    fn test_flash_file_writes_image() {
        let path = std::env::temp_dir().join("flashkit-dummy-test-image.bin");
        fs::write(&path, [0x00, 0x10, 0x00, 0x20]).unwrap();

        let mut t = connected(DummyConfig::default(), "STM32F765ZG");
        assert_eq!(t.flash_file(&path, DEFAULT_FLASH_BASE).unwrap(), 4);
        assert_eq!(&t.flash_data()[..4], &[0x00, 0x10, 0x00, 0x20]);
        assert_eq!(t.read_u32(DEFAULT_FLASH_BASE).unwrap(), 0x2000_1000);

        // Out of range base
        assert_eq!(t.flash_file(&path, 0x2000_0000).unwrap(), -1);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_flash_missing_file() {
        let mut t = connected(DummyConfig::default(), "STM32F765ZG");
        let code = t
            .flash_file(Path::new("/nonexistent/flashkit.bin"), DEFAULT_FLASH_BASE)
            .unwrap();
        assert!(code < 0);
    }

    #[test]
    fn test_rtt_roundtrip() {
        let mut t = connected(DummyConfig::default(), "STM32F765ZG");
        let mut buf = [0u8; 8];
        assert!(t.rtt_read(0, &mut buf).is_err());

        t.rtt_start(None).unwrap();
        t.push_rtt_output(b"hello");
        assert_eq!(t.rtt_read(0, &mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(t.rtt_read(0, &mut buf).unwrap(), 0);

        assert_eq!(t.rtt_write(0, b"ping\n").unwrap(), 5);
        assert_eq!(t.rtt_input(), b"ping\n");
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut t = connected(DummyConfig::default(), "Cortex-M7");
        t.close();
        t.close();
        assert_eq!(t.closes(), 1);
        assert!(!t.is_open());
        assert!(t.read_u32(DEFAULT_LIVENESS_ADDRESS).is_err());
    }
}
