//! Flash orchestration
//!
//! One call takes a probe selection, a firmware image and an optional target
//! name through the full sequence: pick a probe, open a programmer, check
//! the probe, connect, flash with verification and reset, disconnect.

use std::path::{Path, PathBuf};

use flashkit_core::log::Logger;
use flashkit_core::probe::ProbeInfo;
use flashkit_core::programmer::Programmer;

use crate::error::{FlashError, Result};
use crate::registry::{self, DEFAULT_PROGRAMMER};

/// What to flash and with which probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashRequest {
    /// Programmer specification (`jlink`, `jlink:speed=1000`, ...)
    pub programmer: String,
    /// Probe serial; the first attached probe if `None`
    pub serial: Option<u32>,
    /// Firmware image (.hex, .bin, .elf)
    pub firmware: PathBuf,
    /// Target name; auto-detected if `None`
    pub mcu: Option<String>,
}

impl FlashRequest {
    /// Request flashing `firmware` with the default programmer
    pub fn new(firmware: impl Into<PathBuf>) -> Self {
        Self {
            programmer: DEFAULT_PROGRAMMER.to_string(),
            serial: None,
            firmware: firmware.into(),
            mcu: None,
        }
    }

    /// Set the programmer specification
    pub fn programmer(mut self, programmer: impl Into<String>) -> Self {
        self.programmer = programmer.into();
        self
    }

    /// Set the probe serial
    pub fn serial(mut self, serial: Option<u32>) -> Self {
        self.serial = serial;
        self
    }

    /// Set the target name
    pub fn mcu(mut self, mcu: Option<String>) -> Self {
        self.mcu = mcu;
        self
    }
}

/// Outcome of a successful flashing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashReport {
    /// Serial of the probe used
    pub serial: Option<u32>,
    /// Target name the session was connected with
    pub target: Option<String>,
}

/// Pick the probe to use
///
/// An explicit serial is returned as is. Otherwise the first enumerated
/// probe is taken; if there are several the rest are listed in a warning.
pub fn select_probe(
    probes: &[ProbeInfo],
    serial: Option<u32>,
    programmer: &str,
    logger: &Logger,
) -> Result<Option<u32>> {
    if serial.is_some() {
        return Ok(serial);
    }

    let Some(first) = probes.first() else {
        return Err(FlashError::NoProbes {
            programmer: programmer.to_string(),
        });
    };
    logger.info(format_args!("Using {} with {}", programmer, first));

    if probes.len() > 1 {
        let serials: Vec<String> = probes
            .iter()
            .map(|p| match p.serial {
                Some(sn) => sn.to_string(),
                None => "<none>".to_string(),
            })
            .collect();
        logger.warn(format_args!(
            "Multiple {} devices found ({}). Using first one. Available serials: {}",
            programmer,
            probes.len(),
            serials.join(", ")
        ));
    }

    Ok(first.serial)
}

/// Check that the firmware image exists
pub fn check_firmware(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(FlashError::FirmwareNotFound(path.to_path_buf()))
    }
}

/// Run probe check, connect, flash and reset on an open programmer
///
/// The caller owns `programmer` and with it the final disconnect.
pub fn run_flash_sequence<P: Programmer + ?Sized>(
    programmer: &mut P,
    firmware: &Path,
    mcu: Option<&str>,
    logger: &Logger,
) -> Result<FlashReport> {
    let serial = programmer.serial();
    if !programmer.probe() {
        return Err(FlashError::ProbeUnavailable {
            programmer: programmer.name().to_string(),
            serial,
        });
    }

    logger.info(format_args!("Connecting to device..."));
    if !programmer.connect(mcu) {
        return Err(FlashError::ConnectFailed);
    }
    let target = programmer.target().map(str::to_string);
    if let Some(target) = &target {
        logger.info(format_args!("Connected to: {}", target));
    }

    logger.info(format_args!("Flashing {}...", firmware.display()));
    if !programmer.flash(firmware, true, true) {
        return Err(FlashError::FlashFailed);
    }
    logger.info(format_args!("Flash completed successfully!"));

    if programmer.is_connected() {
        logger.info(format_args!("Resetting device..."));
        programmer.reset(false);
    }

    Ok(FlashReport { serial, target })
}

/// Flash a device end to end
///
/// Configuration errors (unknown programmer, missing firmware) are reported
/// before any probe is touched. The programmer is disconnected on every
/// exit path once opened.
pub fn flash_device(request: &FlashRequest, logger: &Logger) -> Result<FlashReport> {
    let params = registry::parse_programmer_params(&request.programmer)?;
    if registry::find_programmer(&params.name).is_none() {
        return Err(FlashError::UnknownProgrammer {
            name: params.name,
            supported: registry::programmer_names_short(),
        });
    }
    check_firmware(&request.firmware)?;

    let serial = match request.serial {
        Some(sn) => Some(sn),
        None => {
            logger.info(format_args!(
                "No serial number specified, searching for connected {} devices...",
                params.name
            ));
            let probes = registry::list_probes(&request.programmer)?;
            select_probe(&probes, None, &params.name, logger)?
        }
    };

    let mut handle = registry::open_programmer(&request.programmer, serial, logger.clone())?;
    run_flash_sequence(&mut handle, &request.firmware, request.mcu.as_deref(), logger)
}

/// Flash a device through the probe with `serial` (first available if
/// `None`), auto-detecting the target unless `mcu` names it
pub fn flash_device_by_usb(
    serial: Option<u32>,
    firmware: impl Into<PathBuf>,
    mcu: Option<&str>,
    programmer: &str,
) -> Result<FlashReport> {
    let request = FlashRequest::new(firmware)
        .programmer(programmer)
        .serial(serial)
        .mcu(mcu.map(str::to_string));
    flash_device(&request, &Logger::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ProgrammerHandle;
    use flashkit_core::log::MemorySink;
    use flashkit_core::probe::ProbeKind;
    use flashkit_core::programmer::RttControl;
    use log::Level;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Rc;
    use std::sync::Arc;

    #[derive(Clone, Copy, PartialEq)]
    enum FlashBehaviour {
        Succeed,
        Fail,
        Panic,
    }

    /// Programmer counting `disconnect` calls and the sessions they close
    struct MockProgrammer {
        present: bool,
        connect_ok: bool,
        flash: FlashBehaviour,
        open: bool,
        target: Option<String>,
        disconnects: Rc<Cell<usize>>,
        closes: Rc<Cell<usize>>,
        resets: Rc<Cell<usize>>,
    }

    impl MockProgrammer {
        fn new(flash: FlashBehaviour) -> Self {
            Self {
                present: true,
                connect_ok: true,
                flash,
                open: false,
                target: None,
                disconnects: Rc::new(Cell::new(0)),
                closes: Rc::new(Cell::new(0)),
                resets: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Programmer for MockProgrammer {
        fn name(&self) -> &'static str {
            "mock"
        }
        fn serial(&self) -> Option<u32> {
            Some(111)
        }
        fn probe(&self) -> bool {
            self.present
        }
        fn connect(&mut self, target: Option<&str>) -> bool {
            if !self.connect_ok {
                return false;
            }
            self.open = true;
            self.target = Some(target.unwrap_or("STM32F765ZG").to_string());
            true
        }
        fn is_connected(&self) -> bool {
            self.open
        }
        fn target(&self) -> Option<&str> {
            self.target.as_deref()
        }
        fn flash(&mut self, _path: &Path, _verify: bool, _reset_after: bool) -> bool {
            match self.flash {
                FlashBehaviour::Succeed => true,
                FlashBehaviour::Fail => false,
                FlashBehaviour::Panic => panic!("probe fell off the bus"),
            }
        }
        fn reset(&mut self, _halt: bool) {
            self.resets.set(self.resets.get() + 1);
        }
        fn disconnect(&mut self) {
            self.disconnects.set(self.disconnects.get() + 1);
            if self.open {
                self.closes.set(self.closes.get() + 1);
                self.open = false;
            }
            self.target = None;
        }
        fn read_memory(&mut self, _address: u32, _length: usize) -> Option<Vec<u8>> {
            None
        }
        fn as_rtt(&mut self) -> Option<&mut dyn RttControl> {
            None
        }
    }

    fn firmware() -> PathBuf {
        PathBuf::from("firmware.hex")
    }

    #[test]
    fn test_select_probe_explicit_serial() {
        let selected = select_probe(&[], Some(42), "jlink", &Logger::default()).unwrap();
        assert_eq!(selected, Some(42));
    }

    #[test]
    fn test_select_probe_none_attached() {
        let err = select_probe(&[], None, "jlink", &Logger::default()).unwrap_err();
        assert!(matches!(err, FlashError::NoProbes { .. }));
    }

    #[test]
    fn test_select_probe_ambiguous() {
        let probes = vec![
            ProbeInfo::new(ProbeKind::JLink, Some(111), None),
            ProbeInfo::new(ProbeKind::JLink, Some(222), None),
        ];
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sink(sink.clone());

        let selected = select_probe(&probes, None, "jlink", &logger).unwrap();
        assert_eq!(selected, Some(111));
        assert!(sink.contains(Level::Warn, "222"));
        assert!(sink.contains(Level::Warn, "Using first one"));
    }

    #[test]
    fn test_sequence_success() {
        let mock = MockProgrammer::new(FlashBehaviour::Succeed);
        let disconnects = mock.disconnects.clone();
        let closes = mock.closes.clone();
        let resets = mock.resets.clone();
        let mut handle = ProgrammerHandle::new(Box::new(mock));

        let report = run_flash_sequence(&mut handle, &firmware(), None, &Logger::default()).unwrap();
        assert_eq!(report.serial, Some(111));
        assert_eq!(report.target.as_deref(), Some("STM32F765ZG"));
        // The mock leaves the session open after flashing, so a reset follows
        assert_eq!(resets.get(), 1);
        assert_eq!(disconnects.get(), 0);

        drop(handle);
        assert_eq!(disconnects.get(), 1);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_flash_failure_disconnects_once() {
        let mock = MockProgrammer::new(FlashBehaviour::Fail);
        let disconnects = mock.disconnects.clone();
        let closes = mock.closes.clone();
        let resets = mock.resets.clone();
        let mut handle = ProgrammerHandle::new(Box::new(mock));

        let err = run_flash_sequence(&mut handle, &firmware(), Some("STM32F765ZG"), &Logger::default())
            .unwrap_err();
        assert!(matches!(err, FlashError::FlashFailed));
        assert_eq!(resets.get(), 0);

        drop(handle);
        assert_eq!(disconnects.get(), 1);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_flash_panic_disconnects_once() {
        let mock = MockProgrammer::new(FlashBehaviour::Panic);
        let disconnects = mock.disconnects.clone();
        let closes = mock.closes.clone();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut handle = ProgrammerHandle::new(Box::new(mock));
            let _ = run_flash_sequence(&mut handle, &firmware(), None, &Logger::default());
        }));
        assert!(result.is_err());
        assert_eq!(disconnects.get(), 1);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_probe_missing() {
        let mut mock = MockProgrammer::new(FlashBehaviour::Succeed);
        mock.present = false;
        let disconnects = mock.disconnects.clone();
        let closes = mock.closes.clone();
        let mut handle = ProgrammerHandle::new(Box::new(mock));

        let err = run_flash_sequence(&mut handle, &firmware(), None, &Logger::default()).unwrap_err();
        assert!(matches!(
            err,
            FlashError::ProbeUnavailable {
                serial: Some(111),
                ..
            }
        ));
        drop(handle);
        assert_eq!(disconnects.get(), 1);
        assert_eq!(closes.get(), 0);
    }

    #[test]
    fn test_connect_failure() {
        let mut mock = MockProgrammer::new(FlashBehaviour::Succeed);
        mock.connect_ok = false;
        let mut handle = ProgrammerHandle::new(Box::new(mock));
        let err = run_flash_sequence(&mut handle, &firmware(), None, &Logger::default()).unwrap_err();
        assert!(matches!(err, FlashError::ConnectFailed));
    }

    #[test]
    fn test_config_errors_before_probe_access() {
        let request = FlashRequest::new("/nonexistent/firmware.hex").programmer("stlink");
        assert!(matches!(
            flash_device(&request, &Logger::default()),
            Err(FlashError::UnknownProgrammer { .. })
        ));
    }

    #[cfg(feature = "jlink")]
    #[test]
    fn test_missing_firmware() {
        let request = FlashRequest::new("/nonexistent/firmware.hex");
        assert!(matches!(
            flash_device(&request, &Logger::default()),
            Err(FlashError::FirmwareNotFound(_))
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_flash_device_with_simulated_probe() {
        let image = std::env::temp_dir().join("flashkit-orchestrator-image.bin");
        std::fs::write(&image, [0u8; 16]).unwrap();

        let request = FlashRequest::new(&image).programmer("dummy:serials=111+222");
        let report = flash_device(&request, &Logger::default()).unwrap();
        assert_eq!(report.serial, Some(111));
        assert_eq!(report.target.as_deref(), Some("STM32F765ZG"));

        let request = FlashRequest::new(&image)
            .programmer("dummy:serials=111+222")
            .serial(Some(333));
        assert!(matches!(
            flash_device(&request, &Logger::default()),
            Err(FlashError::ProbeUnavailable { .. })
        ));
        std::fs::remove_file(image).ok();
    }
}
