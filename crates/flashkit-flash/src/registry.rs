//! Programmer registry and initialization
//!
//! This module handles opening programmers by name and wrapping them in a
//! `ProgrammerHandle`, and enumerating the probes each programmer can reach.

use std::collections::HashMap;

use flashkit_core::log::Logger;
use flashkit_core::probe::ProbeInfo;

use crate::error::{FlashError, Result};
use crate::handle::ProgrammerHandle;

/// Programmer used when none is named
pub const DEFAULT_PROGRAMMER: &str = "jlink";

/// Parsed programmer parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name (canonical, lower case)
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Parameters as `(key, value)` pairs for programmer option parsers
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2". Aliases resolve to the
/// canonical name.
///
/// # Example
/// ```
/// use flashkit_flash::parse_programmer_params;
///
/// let params = parse_programmer_params("jlink:speed=1000").unwrap();
/// assert_eq!(params.name, "jlink");
/// assert_eq!(params.params.get("speed"), Some(&"1000".to_string()));
/// ```
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(FlashError::InvalidParameter("empty programmer name".into()));
    }

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.trim().to_string(), value.trim().to_string());
            } else {
                return Err(FlashError::InvalidParameter(format!(
                    "Invalid parameter format: '{}' (expected key=value)",
                    opt
                )));
            }
        }
    }

    let name = match find_programmer(&name) {
        Some(info) => info.name.to_string(),
        None => name,
    };

    Ok(ProgrammerParams { name, params })
}

fn unknown(name: &str) -> FlashError {
    FlashError::UnknownProgrammer {
        name: name.to_string(),
        supported: programmer_names_short(),
    }
}

/// Enumerate the probes a programmer can reach
///
/// # Arguments
/// * `programmer` - Programmer specification (e.g., "jlink" or "jlink:lib=/opt/SEGGER/JLink/libjlinkarm.so")
pub fn list_probes(programmer: &str) -> Result<Vec<ProbeInfo>> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "jlink")]
        "jlink" => {
            let options = flashkit_jlink::parse_options(&params.pairs())
                .map_err(|e| FlashError::InvalidParameter(e.to_string()))?;
            Ok(flashkit_jlink::enumerate(&options)?)
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            use flashkit_core::programmer::DebugTransport;
            let config = dummy_config(&params)?;
            Ok(flashkit_dummy::SimulatedTarget::new(config).list_probes()?)
        }

        _ => Err(unknown(&params.name)),
    }
}

/// Open a programmer bound to the probe with `serial`
///
/// This is the main entry point for the CLI. It handles:
/// 1. Parsing the programmer string
/// 2. Opening the appropriate programmer
/// 3. Wrapping it in a `ProgrammerHandle` that disconnects on drop
///
/// Nothing is connected yet; call `connect` on the handle.
///
/// # Example
/// ```ignore
/// let mut handle = open_programmer("jlink", Some(123456), Logger::default())?;
/// if handle.connect(None) {
///     println!("Connected to {}", handle.target().unwrap_or("?"));
/// }
/// ```
pub fn open_programmer(
    programmer: &str,
    serial: Option<u32>,
    logger: Logger,
) -> Result<ProgrammerHandle> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "jlink")]
        "jlink" => open_jlink(&params, serial, logger),

        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params, serial, logger),

        _ => {
            let _ = (serial, logger);
            Err(unknown(&params.name))
        }
    }
}

// Programmer-specific open functions

#[cfg(feature = "jlink")]
fn open_jlink(
    params: &ProgrammerParams,
    serial: Option<u32>,
    logger: Logger,
) -> Result<ProgrammerHandle> {
    use flashkit_jlink::JLinkProgrammer;

    let options = flashkit_jlink::parse_options(&params.pairs())
        .map_err(|e| FlashError::InvalidParameter(e.to_string()))?;
    log::debug!("Opening J-Link programmer...");
    let programmer =
        JLinkProgrammer::open(serial, options, logger).map_err(flashkit_core::error::Error::from)?;
    Ok(ProgrammerHandle::new(Box::new(programmer)))
}

#[cfg(feature = "dummy")]
fn dummy_config(params: &ProgrammerParams) -> Result<flashkit_dummy::DummyConfig> {
    use flashkit_dummy::DummyConfig;

    let mut config = match params.params.get("target").map(String::as_str) {
        None | Some("stm32f765") => DummyConfig::stm32f765(),
        Some("unpowered") => DummyConfig::unpowered(),
        Some(other) => {
            return Err(FlashError::InvalidParameter(format!(
                "Unknown dummy target '{}' (expected stm32f765 or unpowered)",
                other
            )))
        }
    };

    // Serials are '+' separated since ',' separates parameters
    if let Some(list) = params.params.get("serials") {
        let serials = list
            .split('+')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| FlashError::InvalidParameter(format!("Invalid serial: {}", s)))
            })
            .collect::<Result<Vec<_>>>()?;
        config = config.with_serials(&serials);
    }

    Ok(config)
}

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &ProgrammerParams,
    serial: Option<u32>,
    logger: Logger,
) -> Result<ProgrammerHandle> {
    use flashkit_dummy::SimulatedTarget;
    use flashkit_jlink::{JLinkOptions, JLinkProgrammer};

    let config = dummy_config(params)?;
    log::debug!("Opening simulated probe...");
    let programmer = JLinkProgrammer::with_transport(
        SimulatedTarget::new(config),
        serial,
        JLinkOptions::default(),
        logger,
    )
    .named("dummy");
    Ok(ProgrammerHandle::new(Box::new(programmer)))
}

// Programmer information and listing
/// Information about a programmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "jlink")]
    programmers.push(ProgrammerInfo {
        name: "jlink",
        aliases: &["j-link"],
        description: "SEGGER J-Link debug probe (lib=<path>,speed=<kHz>,iface=<swd|jtag>,base=<addr>)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated probe and STM32F765 target for testing (serials=<a+b>,target=<stm32f765|unpowered>)",
    });

    programmers
}

/// Look up a programmer by name or alias (case-insensitive)
pub fn find_programmer(name: &str) -> Option<ProgrammerInfo> {
    available_programmers().into_iter().find(|p| {
        p.name.eq_ignore_ascii_case(name) || p.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    })
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    if programmers.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let p = parse_programmer_params("jlink").unwrap();
        assert_eq!(p.name, "jlink");
        assert!(p.params.is_empty());
    }

    #[test]
    fn test_parse_with_params() {
        let p = parse_programmer_params("jlink:lib=/opt/jlink.so,speed=1000").unwrap();
        assert_eq!(p.params.get("lib").map(String::as_str), Some("/opt/jlink.so"));
        assert_eq!(p.params.get("speed").map(String::as_str), Some("1000"));
        assert_eq!(p.pairs().len(), 2);
    }

    #[test]
    fn test_parse_rejects_bare_option() {
        assert!(matches!(
            parse_programmer_params("jlink:speed"),
            Err(FlashError::InvalidParameter(_))
        ));
        assert!(parse_programmer_params(":speed=1").is_err());
    }

    #[cfg(feature = "jlink")]
    #[test]
    fn test_alias_resolves() {
        assert_eq!(parse_programmer_params("J-Link").unwrap().name, "jlink");
        assert_eq!(find_programmer("JLINK").map(|p| p.name), Some("jlink"));
    }

    #[test]
    fn test_unknown_programmer() {
        assert!(find_programmer("stlink").is_none());
        let err = open_programmer("stlink", None, Logger::default())
            .err()
            .unwrap();
        assert!(matches!(err, FlashError::UnknownProgrammer { .. }));
        assert!(err.to_string().starts_with("Unsupported programmer: stlink"));
        assert!(list_probes("stlink").is_err());
    }

    #[test]
    fn test_names_short_lists_every_programmer() {
        let names = programmer_names_short();
        for p in available_programmers() {
            assert!(names.contains(p.name));
        }
    }

    #[cfg(feature = "jlink")]
    #[test]
    fn test_open_jlink_missing_library() {
        let err = open_programmer("jlink:lib=/nonexistent/libjlinkarm.so", None, Logger::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            FlashError::Transport(flashkit_core::error::Error::Library(_))
        ));
        assert!(err.to_string().contains("/nonexistent/libjlinkarm.so"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_probes() {
        let probes = list_probes("dummy:serials=111+222").unwrap();
        let serials: Vec<_> = probes.iter().map(|p| p.serial).collect();
        assert_eq!(serials, vec![Some(111), Some(222)]);
        assert!(list_probes("dummy:serials=abc").is_err());
        assert!(list_probes("dummy:target=nrf52").is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        use flashkit_core::programmer::Programmer;

        let mut handle = open_programmer("dummy", Some(123456), Logger::default()).unwrap();
        assert_eq!(handle.name(), "dummy");
        assert!(handle.probe());
        assert!(handle.connect(None));
        assert_eq!(handle.target(), Some("STM32F765ZG"));
    }
}
