//! Target identification
//!
//! Identification runs in two phases over an open transport:
//!
//! 1. Core acquisition: connect naming each candidate core in turn and read
//!    a liveness register. The first core that connects and returns a
//!    plausible word is accepted.
//! 2. ID register phase: read each candidate identification register in
//!    order and stop at the first plausible word.
//!
//! The word is then decoded against a [`SiliconCatalog`].

use std::fmt;

use crate::catalog::{SiliconCatalog, DEVICE_ID_MASK};
use crate::log::Logger;
use crate::programmer::{DebugTransport, FALLBACK_CORE};

/// DBGMCU_IDCODE on most Cortex-M3/M4/M7 STM32 parts
pub const DEFAULT_LIVENESS_ADDRESS: u32 = 0xE004_2000;

/// A candidate location of the silicon identification word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRegisterProbe {
    /// Register address
    pub address: u32,
    /// Families that keep their ID word here
    pub description: String,
}

impl IdRegisterProbe {
    /// Create a register probe entry
    pub fn new(address: u32, description: impl Into<String>) -> Self {
        Self {
            address,
            description: description.into(),
        }
    }
}

impl fmt::Display for IdRegisterProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X} ({})", self.address, self.description)
    }
}

/// Default ID register search order
pub fn default_id_registers() -> Vec<IdRegisterProbe> {
    vec![
        IdRegisterProbe::new(0xE004_2000, "STM32F1/F2/F3/F4/F7/L1/L4/G4/WB"),
        IdRegisterProbe::new(0x4001_5800, "STM32F0/G0/L0/C0"),
        IdRegisterProbe::new(0x5C00_1000, "STM32H7"),
        IdRegisterProbe::new(0xE004_4000, "STM32L5/U5/H5"),
    ]
}

/// Tunables for identification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyConfig {
    /// Core names to try, in order
    pub cores: Vec<String>,
    /// Register read after each core connect to check the link is live
    pub liveness_address: u32,
    /// ID register candidates, in order
    pub id_registers: Vec<IdRegisterProbe>,
    /// Core connected with when identification fails
    pub fallback_core: String,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            cores: ["Cortex-M7", "Cortex-M4", "Cortex-M3", "Cortex-M0"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            liveness_address: DEFAULT_LIVENESS_ADDRESS,
            id_registers: default_id_registers(),
            fallback_core: FALLBACK_CORE.to_string(),
        }
    }
}

/// Decoded silicon identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiliconIdentity {
    /// 12-bit device id
    pub device_id: u16,
    /// 16-bit revision id
    pub revision_id: u16,
    /// Family name or `Unknown (0xNNN)`
    pub family: String,
    /// Part number from the catalog, or derived from the family name
    pub part_number: String,
    /// True if the part number is not a catalog entry
    pub derived: bool,
    /// Core accepted during core acquisition
    pub core: Option<String>,
    /// Register address the word was read from
    pub register: Option<u32>,
}

impl SiliconIdentity {
    /// Name to reconnect with: the part number when the catalog knows it,
    /// the accepted core otherwise
    pub fn connect_name(&self) -> Option<&str> {
        if self.derived {
            self.core.as_deref()
        } else {
            Some(&self.part_number)
        }
    }
}

impl fmt::Display for SiliconIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}), device id 0x{:03X}, revision 0x{:04X}",
            self.part_number, self.family, self.device_id, self.revision_id
        )
    }
}

/// Returns true unless the word is one of the "nothing there" patterns an
/// unpowered or unmapped bus returns
pub fn is_plausible_word(word: u32) -> bool {
    word != 0 && word != 0xFFFF_FFFF
}

/// Decode an identification word against a catalog
pub fn decode(word: u32, catalog: &SiliconCatalog) -> SiliconIdentity {
    let device_id = (word & DEVICE_ID_MASK) as u16;
    let revision_id = ((word >> 16) & 0xFFFF) as u16;
    let info = catalog.info(device_id);
    SiliconIdentity {
        device_id,
        revision_id,
        family: info.family,
        part_number: info.part_number,
        derived: info.derived_part,
        core: None,
        register: None,
    }
}

/// Connect naming each candidate core until one answers with a plausible
/// liveness word
///
/// Returns the accepted core name. The transport stays connected with it.
pub fn acquire_core<T: DebugTransport + ?Sized>(
    transport: &mut T,
    config: &IdentifyConfig,
    logger: &Logger,
) -> Option<String> {
    for core in &config.cores {
        logger.debug(format_args!("Trying core {}", core));
        if let Err(e) = transport.connect(core) {
            logger.debug(format_args!("Core {} did not connect: {}", core, e));
            continue;
        }
        match transport.read_u32(config.liveness_address) {
            Ok(word) if is_plausible_word(word) => {
                logger.debug(format_args!(
                    "Core {} live, 0x{:08X} = 0x{:08X}",
                    core, config.liveness_address, word
                ));
                return Some(core.clone());
            }
            Ok(word) => logger.debug(format_args!(
                "Core {} not live, 0x{:08X} = 0x{:08X}",
                core, config.liveness_address, word
            )),
            Err(e) => logger.debug(format_args!("Core {} liveness read failed: {}", core, e)),
        }
    }
    None
}

/// Read the candidate ID registers in order, returning the first plausible
/// word and the register it came from
pub fn read_id_word<T: DebugTransport + ?Sized>(
    transport: &mut T,
    config: &IdentifyConfig,
    logger: &Logger,
) -> Option<(u32, u32)> {
    for register in &config.id_registers {
        match transport.read_u32(register.address) {
            Ok(word) if is_plausible_word(word) => {
                logger.debug(format_args!("ID word 0x{:08X} at {}", word, register));
                return Some((word, register.address));
            }
            Ok(word) => logger.debug(format_args!("No ID at {}: 0x{:08X}", register, word)),
            Err(e) => logger.debug(format_args!("No ID at {}: {}", register, e)),
        }
    }
    None
}

/// Identify the connected silicon
///
/// `None` means no candidate core was live or no ID register returned a
/// plausible word.
pub fn identify<T: DebugTransport + ?Sized>(
    transport: &mut T,
    config: &IdentifyConfig,
    catalog: &SiliconCatalog,
    logger: &Logger,
) -> Option<SiliconIdentity> {
    let Some(core) = acquire_core(transport, config, logger) else {
        logger.debug(format_args!("No candidate core answered"));
        return None;
    };
    logger.info(format_args!("Connected to core {}", core));

    let Some((word, address)) = read_id_word(transport, config, logger) else {
        logger.debug(format_args!("No ID register returned a plausible value"));
        return None;
    };

    let mut identity = decode(word, catalog);
    identity.core = Some(core);
    identity.register = Some(address);
    logger.info(format_args!("Detected {}", identity));
    Some(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::log::MemorySink;
    use crate::probe::ProbeInfo;
    use crate::programmer::Interface;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    /// Transport answering reads from a per-core register map
    #[derive(Default)]
    struct ScriptedTransport {
        live: HashMap<String, HashMap<u32, u32>>,
        refuse: Vec<String>,
        current: Option<String>,
        reads: Vec<u32>,
    }

    impl ScriptedTransport {
        fn core(mut self, name: &str, regs: &[(u32, u32)]) -> Self {
            self.live
                .insert(name.to_string(), regs.iter().copied().collect());
            self
        }

        fn reads_of(&self, address: u32) -> usize {
            self.reads.iter().filter(|&&a| a == address).count()
        }
    }

    impl DebugTransport for ScriptedTransport {
        fn list_probes(&self) -> Result<Vec<ProbeInfo>> {
            Ok(Vec::new())
        }
        fn open(&mut self, _serial: Option<u32>) -> Result<()> {
            Ok(())
        }
        fn is_open(&self) -> bool {
            true
        }
        fn select_interface(&mut self, _interface: Interface) -> Result<()> {
            Ok(())
        }
        fn connect(&mut self, target: &str) -> Result<()> {
            if self.refuse.iter().any(|r| r == target) {
                return Err(Error::ConnectFailed {
                    target: target.into(),
                    reason: "refused".into(),
                });
            }
            self.current = Some(target.to_string());
            Ok(())
        }
        fn is_connected(&self) -> bool {
            self.current.is_some()
        }
        fn read_u32(&mut self, address: u32) -> Result<u32> {
            self.reads.push(address);
            let regs = self.current.as_ref().and_then(|c| self.live.get(c));
            match regs {
                Some(regs) => regs.get(&address).copied().ok_or(Error::ReadFailed {
                    address,
                    reason: "unmapped".into(),
                }),
                None => Ok(0),
            }
        }
        fn read_memory(&mut self, _address: u32, _buf: &mut [u8]) -> Result<()> {
            Ok(())
        }
        fn is_halted(&mut self) -> Result<bool> {
            Ok(true)
        }
        fn halt(&mut self) -> Result<()> {
            Ok(())
        }
        fn flash_file(&mut self, _path: &Path, _base_address: u32) -> Result<i32> {
            Ok(0)
        }
        fn reset(&mut self, _halt: bool) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) {
            self.current = None;
        }
    }

    fn f7_catalog() -> SiliconCatalog {
        SiliconCatalog::from_tables(&[(0x411, "STM32F76xxx/77xxx")], &[(0x411, "STM32F765ZG")])
    }

    #[test]
    fn test_plausible_word() {
        assert!(!is_plausible_word(0));
        assert!(!is_plausible_word(0xFFFF_FFFF));
        assert!(is_plausible_word(0x1000_6451));
    }

    #[test]
    fn test_decode_fields() {
        for word in [0x0642_1411u32, 0x1000_6451, 0xFFFF_0FFF, 0x0001_0000, 0x8000_0001] {
            let id = decode(word, SiliconCatalog::builtin());
            assert_eq!(u32::from(id.device_id), word & 0xFFF);
            assert_eq!(u32::from(id.revision_id), (word >> 16) & 0xFFFF);
        }
    }

    #[test]
    fn test_decode_with_custom_catalog() {
        let id = decode(0x0642_1411, &f7_catalog());
        assert_eq!(id.device_id, 0x411);
        assert_eq!(id.revision_id, 0x0642);
        assert_eq!(id.family, "STM32F76xxx/77xxx");
        assert_eq!(id.part_number, "STM32F765ZG");
        assert!(!id.derived);
    }

    #[test]
    fn test_decode_unknown_id() {
        let id = decode(0x0001_0123, &SiliconCatalog::default());
        assert_eq!(id.family, "Unknown (0x123)");
        assert_eq!(id.part_number, "Unknown_(0x123)");
        assert!(id.derived);
    }

    #[test]
    fn test_acquire_core_skips_dead_cores() {
        let mut t = ScriptedTransport::default()
            .core("Cortex-M7", &[(DEFAULT_LIVENESS_ADDRESS, 0)])
            .core("Cortex-M4", &[(DEFAULT_LIVENESS_ADDRESS, 0xFFFF_FFFF)])
            .core("Cortex-M3", &[(DEFAULT_LIVENESS_ADDRESS, 0x1000_6410)]);
        let core = acquire_core(&mut t, &IdentifyConfig::default(), &Logger::default());
        assert_eq!(core.as_deref(), Some("Cortex-M3"));
        assert_eq!(t.current.as_deref(), Some("Cortex-M3"));
    }

    #[test]
    fn test_acquire_core_skips_refused_connect() {
        let mut t = ScriptedTransport::default()
            .core("Cortex-M7", &[(DEFAULT_LIVENESS_ADDRESS, 0x1000_6451)])
            .core("Cortex-M4", &[(DEFAULT_LIVENESS_ADDRESS, 0x1000_6413)]);
        t.refuse.push("Cortex-M7".into());
        let core = acquire_core(&mut t, &IdentifyConfig::default(), &Logger::default());
        assert_eq!(core.as_deref(), Some("Cortex-M4"));
    }

    #[test]
    fn test_core_order_is_configurable() {
        let mut t = ScriptedTransport::default()
            .core("Cortex-M7", &[(DEFAULT_LIVENESS_ADDRESS, 0x1000_6451)])
            .core("Cortex-M0", &[(DEFAULT_LIVENESS_ADDRESS, 0x1000_6440)]);
        let config = IdentifyConfig {
            cores: vec!["Cortex-M0".into(), "Cortex-M7".into()],
            ..IdentifyConfig::default()
        };
        let core = acquire_core(&mut t, &config, &Logger::default());
        assert_eq!(core.as_deref(), Some("Cortex-M0"));
    }

    #[test]
    fn test_id_phase_stops_at_first_plausible() {
        let mut t = ScriptedTransport::default().core(
            "Cortex-M4",
            &[
                (DEFAULT_LIVENESS_ADDRESS, 0xFFFF_FFFF),
                (0x4001_5800, 0x1000_6440),
                (0x5C00_1000, 0x1003_6450),
            ],
        );
        t.current = Some("Cortex-M4".into());
        let found = read_id_word(&mut t, &IdentifyConfig::default(), &Logger::default());
        assert_eq!(found, Some((0x1000_6440, 0x4001_5800)));
        assert_eq!(t.reads_of(0x5C00_1000), 0);
        assert_eq!(t.reads_of(0xE004_4000), 0);
    }

    #[test]
    fn test_identify_full() {
        let mut t = ScriptedTransport::default()
            .core("Cortex-M7", &[(DEFAULT_LIVENESS_ADDRESS, 0x0642_1411)]);
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sink(sink.clone());

        let id = identify(&mut t, &IdentifyConfig::default(), &f7_catalog(), &logger).unwrap();
        assert_eq!(id.part_number, "STM32F765ZG");
        assert_eq!(id.core.as_deref(), Some("Cortex-M7"));
        assert_eq!(id.register, Some(0xE004_2000));
        assert_eq!(id.connect_name(), Some("STM32F765ZG"));
        assert!(sink.contains(log::Level::Info, "STM32F765ZG"));
    }

    #[test]
    fn test_identify_exhaustion() {
        // No core answers
        let mut t = ScriptedTransport::default();
        assert!(identify(
            &mut t,
            &IdentifyConfig::default(),
            SiliconCatalog::builtin(),
            &Logger::default()
        )
        .is_none());

        // Core answers but every ID register reads blank
        let mut t = ScriptedTransport::default().core(
            "Cortex-M4",
            &[
                (DEFAULT_LIVENESS_ADDRESS, 0x2000_0000),
                (0x4001_5800, 0),
                (0x5C00_1000, 0xFFFF_FFFF),
                (0xE004_4000, 0),
            ],
        );
        t.refuse.push("Cortex-M7".into());
        let config = IdentifyConfig {
            id_registers: default_id_registers().split_off(1),
            ..IdentifyConfig::default()
        };
        assert!(identify(&mut t, &config, SiliconCatalog::builtin(), &Logger::default()).is_none());
    }

    #[test]
    fn test_derived_part_connects_with_core() {
        let mut t = ScriptedTransport::default()
            .core("Cortex-M7", &[(DEFAULT_LIVENESS_ADDRESS, 0x1000_0ABC)]);
        let id = identify(
            &mut t,
            &IdentifyConfig::default(),
            &SiliconCatalog::default(),
            &Logger::default(),
        )
        .unwrap();
        assert!(id.derived);
        assert_eq!(id.part_number, "Unknown_(0xABC)");
        assert_eq!(id.connect_name(), Some("Cortex-M7"));
    }
}
