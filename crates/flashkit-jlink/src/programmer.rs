//! J-Link programmer
//!
//! `JLinkProgrammer` drives a [`DebugTransport`] through the programmer
//! lifecycle: open the probe, select the interface, identify the target if
//! no name was given, connect, flash, reset and close. It is generic over
//! the transport so the same logic runs against the simulated target in
//! tests.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flashkit_core::catalog::SiliconCatalog;
use flashkit_core::identify::{self, SiliconIdentity};
use flashkit_core::log::Logger;
use flashkit_core::programmer::{DebugTransport, Programmer, RttControl, RTT_TERMINAL_CHANNEL};

use crate::device::JLink;
use crate::error::Result;
use crate::options::JLinkOptions;

/// Programmer name used on the command line
pub const PROGRAMMER_NAME: &str = "jlink";

/// Programmer for SEGGER J-Link probes
pub struct JLinkProgrammer<T: DebugTransport = JLink> {
    transport: T,
    name: &'static str,
    serial: Option<u32>,
    options: JLinkOptions,
    catalog: Arc<SiliconCatalog>,
    logger: Logger,
    target: Option<String>,
    identity: Option<SiliconIdentity>,
}

impl JLinkProgrammer<JLink> {
    /// Load the J-Link library and bind to the probe with `serial` (first
    /// available if `None`)
    pub fn open(serial: Option<u32>, options: JLinkOptions, logger: Logger) -> Result<Self> {
        let transport = JLink::load(&options)?;
        Ok(Self::with_transport(transport, serial, options, logger))
    }
}

impl<T: DebugTransport> JLinkProgrammer<T> {
    /// Build a programmer on an existing transport
    pub fn with_transport(
        transport: T,
        serial: Option<u32>,
        options: JLinkOptions,
        logger: Logger,
    ) -> Self {
        Self {
            transport,
            name: PROGRAMMER_NAME,
            serial,
            options,
            catalog: SiliconCatalog::shared(),
            logger,
            target: None,
            identity: None,
        }
    }

    /// Use a different silicon catalog for identification
    pub fn with_catalog(mut self, catalog: Arc<SiliconCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Report a different programmer name
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Options in effect
    pub fn options(&self) -> &JLinkOptions {
        &self.options
    }

    /// Identity found by the last successful auto-detection
    pub fn identity(&self) -> Option<&SiliconIdentity> {
        self.identity.as_ref()
    }

    /// Open the probe and select the debug interface
    fn open_session(&mut self) -> bool {
        match self.serial {
            Some(sn) => self
                .logger
                .info(format_args!("Opening J-Link with serial: {}", sn)),
            None => self.logger.info(format_args!("Opening J-Link (first available)")),
        }
        if let Err(e) = self.transport.open(self.serial) {
            self.logger.error(format_args!("Failed to open J-Link: {}", e));
            return false;
        }
        if let Err(e) = self.transport.select_interface(self.options.interface) {
            self.logger.error(format_args!("{}", e));
            self.transport.close();
            return false;
        }
        self.logger.debug(format_args!(
            "Interface set to {}",
            self.options.interface
        ));
        true
    }

    /// Run target identification on the open transport
    pub fn detect_target(&mut self) -> Option<SiliconIdentity> {
        identify::identify(
            &mut self.transport,
            &self.options.identify,
            &self.catalog,
            &self.logger,
        )
    }

    /// Work out the name to connect with when none was given
    fn resolve_target(&mut self) -> String {
        self.logger.info(format_args!("Auto-detecting MCU..."));
        let fallback = self.options.identify.fallback_core.clone();
        let Some(identity) = self.detect_target() else {
            self.logger.warn(format_args!(
                "Could not auto-detect MCU, trying generic {}",
                fallback
            ));
            self.identity = None;
            return fallback;
        };

        let name = match identity.connect_name() {
            Some(name) => name.to_string(),
            None => fallback,
        };
        if identity.derived {
            self.logger.warn(format_args!(
                "{} is not in the catalog, connecting as {}",
                identity.part_number, name
            ));
        } else {
            self.logger.info(format_args!("Detected MCU: {}", name));
        }
        self.identity = Some(identity);
        name
    }

    fn halt_for_flashing(&mut self) {
        match self.transport.is_halted() {
            Ok(true) => {}
            Ok(false) => match self.transport.halt() {
                Ok(()) => self.logger.debug(format_args!("Core halted for flashing")),
                Err(e) => self.logger.warn(format_args!("{}", e)),
            },
            Err(e) => self.logger.warn(format_args!("{}", e)),
        }
    }

    fn flash_connected(&mut self, path: &Path, verify: bool, reset_after: bool) -> bool {
        if !self.transport.is_open() && !self.connect(None) {
            self.logger.error(format_args!("Failed to connect to device"));
            return false;
        }

        self.logger.info(format_args!("Flashing {}...", path.display()));
        self.halt_for_flashing();

        let base = self.options.flash_base;
        match self.transport.flash_file(path, base) {
            Ok(code) if code < 0 => {
                self.logger
                    .error(format_args!("Flash failed with result: {}", code));
                return false;
            }
            Ok(code) => self.logger.info(format_args!(
                "Flash successful: {} bytes written at 0x{:08X}",
                code, base
            )),
            Err(e) => {
                self.logger.error(format_args!("Flash error: {}", e));
                return false;
            }
        }

        if verify {
            // The download call verifies what it programs
            self.logger.info(format_args!("Verifying flash..."));
        }
        if reset_after {
            self.logger.info(format_args!("Resetting device..."));
            self.reset(false);
        }
        true
    }
}

impl<T: DebugTransport> Programmer for JLinkProgrammer<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn serial(&self) -> Option<u32> {
        self.serial
    }

    fn probe(&self) -> bool {
        match self.transport.list_probes() {
            Ok(probes) => match self.serial {
                Some(sn) => probes.iter().any(|p| p.serial == Some(sn)),
                None => !probes.is_empty(),
            },
            Err(e) => {
                self.logger.error(format_args!("Probe error: {}", e));
                false
            }
        }
    }

    fn connect(&mut self, target: Option<&str>) -> bool {
        if self.transport.is_open() {
            self.disconnect();
        }
        if !self.open_session() {
            return false;
        }

        let name = match target {
            Some(name) => {
                self.logger
                    .info(format_args!("Connecting to specified MCU: {}", name));
                name.to_string()
            }
            None => self.resolve_target(),
        };

        if let Err(e) = self.transport.connect(&name) {
            self.logger.error(format_args!("Connection error: {}", e));
            self.transport.close();
            return false;
        }
        self.logger.info(format_args!("Connected to {}", name));
        self.target = Some(name);
        true
    }

    fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn flash(&mut self, path: &Path, verify: bool, reset_after: bool) -> bool {
        let ok = self.flash_connected(path, verify, reset_after);
        self.disconnect();
        ok
    }

    fn reset(&mut self, halt: bool) {
        if !self.transport.is_open() {
            self.logger.warn(format_args!("Not connected, cannot reset"));
            return;
        }
        self.logger
            .info(format_args!("Resetting device (halt={})", halt));
        if let Err(e) = self.transport.reset(halt) {
            self.logger.error(format_args!("Reset error: {}", e));
        }
    }

    fn disconnect(&mut self) {
        if self.transport.is_open() {
            self.logger.info(format_args!("Disconnecting from device"));
            self.transport.close();
        }
        self.target = None;
    }

    fn read_memory(&mut self, address: u32, length: usize) -> Option<Vec<u8>> {
        if !self.transport.is_open() {
            self.logger.error(format_args!("Not connected to device"));
            return None;
        }
        let mut buf = vec![0u8; length];
        match self.transport.read_memory(address, &mut buf) {
            Ok(()) => Some(buf),
            Err(e) => {
                self.logger.error(format_args!("Memory read error: {}", e));
                None
            }
        }
    }

    fn as_rtt(&mut self) -> Option<&mut dyn RttControl> {
        Some(self)
    }
}

impl<T: DebugTransport> RttControl for JLinkProgrammer<T> {
    fn start_rtt(&mut self, control_block: Option<u32>, settle: Duration) -> bool {
        if !self.transport.is_open() {
            self.logger.error(format_args!("Not connected, cannot start RTT"));
            return false;
        }
        if let Err(e) = self.transport.rtt_start(control_block) {
            self.logger.error(format_args!("Failed to start RTT: {}", e));
            return false;
        }
        if !settle.is_zero() {
            thread::sleep(settle);
        }
        self.logger.debug(format_args!("RTT started"));
        true
    }

    fn stop_rtt(&mut self) {
        if !self.transport.is_open() {
            return;
        }
        if let Err(e) = self.transport.rtt_stop() {
            self.logger.debug(format_args!("Failed to stop RTT: {}", e));
        }
    }

    fn rtt_read(&mut self, max_bytes: usize) -> Option<Vec<u8>> {
        if !self.transport.is_open() {
            return None;
        }
        let mut buf = vec![0u8; max_bytes];
        match self.transport.rtt_read(RTT_TERMINAL_CHANNEL, &mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Some(buf)
            }
            Err(e) => {
                self.logger.error(format_args!("RTT read error: {}", e));
                None
            }
        }
    }

    fn rtt_write(&mut self, data: &[u8]) -> Option<usize> {
        if !self.transport.is_open() {
            return None;
        }
        match self.transport.rtt_write(RTT_TERMINAL_CHANNEL, data) {
            Ok(n) => Some(n),
            Err(e) => {
                self.logger.error(format_args!("RTT write error: {}", e));
                None
            }
        }
    }
}

impl<T: DebugTransport> Drop for JLinkProgrammer<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashkit_core::identify::DEFAULT_LIVENESS_ADDRESS;
    use flashkit_core::log::MemorySink;
    use flashkit_dummy::{DummyConfig, SimulatedTarget};
    use log::Level;
    use std::fs;
    use std::path::PathBuf;

    fn programmer(config: DummyConfig) -> JLinkProgrammer<SimulatedTarget> {
        JLinkProgrammer::with_transport(
            SimulatedTarget::new(config),
            None,
            JLinkOptions::default(),
            Logger::default(),
        )
    }

    fn temp_image(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, [0x00, 0x00, 0x02, 0x20, 0x01, 0x02, 0x00, 0x08]).unwrap();
        path
    }

    #[test]
    fn test_probe_by_serial() {
        let config = DummyConfig::default().with_serials(&[111, 222]);
        let p = JLinkProgrammer::with_transport(
            SimulatedTarget::new(config.clone()),
            Some(222),
            JLinkOptions::default(),
            Logger::default(),
        );
        assert!(p.probe());
        assert!(!p.is_connected());

        let p = JLinkProgrammer::with_transport(
            SimulatedTarget::new(config),
            Some(333),
            JLinkOptions::default(),
            Logger::default(),
        );
        assert!(!p.probe());

        assert!(!programmer(DummyConfig::default().with_serials(&[])).probe());
    }

    #[test]
    fn test_connect_auto_detects() {
        let mut p = programmer(DummyConfig::default());
        assert!(p.connect(None));
        assert_eq!(p.target(), Some("STM32F765ZG"));
        assert_eq!(
            p.transport().interface(),
            Some(flashkit_core::programmer::Interface::Swd)
        );
        assert_eq!(p.transport().connects(), &["Cortex-M7", "STM32F765ZG"]);
        let id = p.identity().unwrap();
        assert_eq!(id.device_id, 0x451);
        assert_eq!(id.revision_id, 0x1001);
    }

    #[test]
    fn test_connect_explicit_target_skips_detection() {
        let mut p = programmer(DummyConfig::default());
        assert!(p.connect(Some("STM32F765ZG")));
        assert_eq!(p.transport().connects(), &["STM32F765ZG"]);
        assert!(p.transport().reads().is_empty());
        assert!(p.identity().is_none());
    }

    #[test]
    fn test_connect_falls_back_to_generic_core() {
        let sink = Arc::new(MemorySink::new());
        let mut p = JLinkProgrammer::with_transport(
            SimulatedTarget::new(DummyConfig::unpowered()),
            None,
            JLinkOptions::default(),
            Logger::with_sink(sink.clone()),
        );
        assert!(p.connect(None));
        assert_eq!(p.target(), Some("Cortex-M4"));
        assert_eq!(
            p.transport().connects().last().map(String::as_str),
            Some("Cortex-M4")
        );
        assert!(sink.contains(Level::Warn, "trying generic Cortex-M4"));
    }

    #[test]
    fn test_connect_fallback_refused() {
        let mut p = programmer(DummyConfig::unpowered().refuse("Cortex-M4"));
        assert!(!p.connect(None));
        assert!(!p.is_connected());
        assert_eq!(p.target(), None);
    }

    #[test]
    fn test_connect_custom_catalog() {
        let catalog = SiliconCatalog::from_tables(
            &[(0x411, "STM32F76xxx/77xxx")],
            &[(0x411, "STM32F765ZG")],
        );
        let config = DummyConfig::default().with_register(DEFAULT_LIVENESS_ADDRESS, 0x0642_1411);
        let mut p = programmer(config).with_catalog(Arc::new(catalog));
        assert!(p.connect(None));
        assert_eq!(p.target(), Some("STM32F765ZG"));
    }

    #[test]
    fn test_derived_part_connects_with_core() {
        let config = DummyConfig::default().with_register(DEFAULT_LIVENESS_ADDRESS, 0x1000_0ABC);
        let mut p = programmer(config);
        assert!(p.connect(None));
        assert_eq!(p.target(), Some("Cortex-M7"));
        assert_eq!(p.identity().unwrap().part_number, "Unknown_(0xABC)");
    }

    #[test]
    fn test_open_failure() {
        let mut config = DummyConfig::default();
        config.fail_open = true;
        let mut p = programmer(config);
        assert!(!p.connect(None));
        assert!(p.transport().connects().is_empty());
    }

    #[test]
    fn test_flash_success_disconnects() {
        let image = temp_image("flashkit-jlink-flash-ok.bin");
        let mut p = programmer(DummyConfig::default());
        assert!(p.flash(&image, true, true));
        assert!(!p.is_connected());
        assert_eq!(p.target(), None);

        let t = p.transport();
        assert_eq!(t.flashed().len(), 1);
        assert_eq!(t.flashed()[0].1, 0x0800_0000);
        assert_eq!(t.resets(), 1);
        assert_eq!(t.closes(), 1);
        assert_eq!(&t.flash_data()[..4], &[0x00, 0x00, 0x02, 0x20]);
        fs::remove_file(image).ok();
    }

    #[test]
    fn test_flash_negative_code_fails_and_disconnects() {
        let image = temp_image("flashkit-jlink-flash-fail.bin");
        let mut config = DummyConfig::default();
        config.flash_result = Some(-1);
        let mut p = programmer(config);
        assert!(!p.flash(&image, true, true));
        assert!(!p.is_connected());
        assert_eq!(p.transport().resets(), 0);
        assert_eq!(p.transport().closes(), 1);
        fs::remove_file(image).ok();
    }

    #[test]
    fn test_flash_custom_base() {
        let image = temp_image("flashkit-jlink-flash-base.bin");
        let options = JLinkOptions::default().with_flash_base(0x0800_1000);
        let mut p = JLinkProgrammer::with_transport(
            SimulatedTarget::new(DummyConfig::default()),
            None,
            options,
            Logger::default(),
        );
        assert!(p.flash(&image, false, false));
        assert_eq!(p.transport().flashed()[0].1, 0x0800_1000);
        assert_eq!(p.transport().resets(), 0);
        fs::remove_file(image).ok();
    }

    #[test]
    fn test_reset_when_disconnected_is_noop() {
        let sink = Arc::new(MemorySink::new());
        let mut p = JLinkProgrammer::with_transport(
            SimulatedTarget::new(DummyConfig::default()),
            None,
            JLinkOptions::default(),
            Logger::with_sink(sink.clone()),
        );
        p.reset(false);
        assert_eq!(p.transport().resets(), 0);
        assert!(sink.contains(Level::Warn, "Not connected"));
    }

    #[test]
    fn test_reset_failure_is_swallowed() {
        let mut config = DummyConfig::default();
        config.fail_reset = true;
        let mut p = programmer(config);
        assert!(p.connect(Some("STM32F765ZG")));
        p.reset(true);
        assert!(p.is_connected());
    }

    #[test]
    fn test_disconnect_idempotent() {
        let mut p = programmer(DummyConfig::default());
        assert!(p.connect(None));
        p.disconnect();
        p.disconnect();
        assert_eq!(p.transport().closes(), 1);
        assert_eq!(p.target(), None);
    }

    #[test]
    fn test_read_memory() {
        let mut p = programmer(DummyConfig::default());
        assert_eq!(p.read_memory(0x0800_0000, 4), None);
        assert!(p.connect(None));
        assert_eq!(p.read_memory(0x0800_0000, 4), Some(vec![0xFF; 4]));
        assert_eq!(p.read_memory(0x4000_0000, 4), None);
    }

    #[test]
    fn test_rtt() {
        let mut p = programmer(DummyConfig::default());
        assert!(p.connect(None));
        p.transport_mut().push_rtt_output(b"boot ok\n");

        let rtt = p.as_rtt().unwrap();
        assert!(rtt.start_rtt(None, Duration::ZERO));
        assert_eq!(rtt.rtt_read(4096), Some(b"boot ok\n".to_vec()));
        assert_eq!(rtt.rtt_read(4096), Some(Vec::new()));
        assert_eq!(rtt.rtt_write(b"help\n"), Some(5));
        rtt.stop_rtt();

        assert_eq!(p.transport().rtt_input(), b"help\n");
        assert!(!p.transport().rtt_running());
    }

    #[test]
    fn test_rtt_requires_session() {
        let mut p = programmer(DummyConfig::default());
        let rtt = p.as_rtt().unwrap();
        assert!(!rtt.start_rtt(None, Duration::ZERO));
        assert_eq!(rtt.rtt_read(16), None);
    }
}
