//! J-Link programmer options

use std::path::PathBuf;

use flashkit_core::identify::IdentifyConfig;
use flashkit_core::programmer::{Interface, DEFAULT_FLASH_BASE};

use crate::error::{JLinkError, Result};

/// Default SWD/JTAG clock in kHz
pub const DEFAULT_SPEED_KHZ: u32 = 4000;

/// Configuration for a J-Link programmer
#[derive(Debug, Clone)]
pub struct JLinkOptions {
    /// Library to load instead of the platform default
    pub library: Option<PathBuf>,
    /// Interface clock in kHz (default: 4000)
    pub speed_khz: u32,
    /// Debug interface (default: SWD)
    pub interface: Interface,
    /// Address images are programmed at
    pub flash_base: u32,
    /// Target identification tunables
    pub identify: IdentifyConfig,
}

impl Default for JLinkOptions {
    fn default() -> Self {
        Self {
            library: None,
            speed_khz: DEFAULT_SPEED_KHZ,
            interface: Interface::Swd,
            flash_base: DEFAULT_FLASH_BASE,
            identify: IdentifyConfig::default(),
        }
    }
}

impl JLinkOptions {
    /// Set the flash base address
    pub fn with_flash_base(mut self, flash_base: u32) -> Self {
        self.flash_base = flash_base;
        self
    }
}

fn parse_u32(value: &str) -> Option<u32> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Parse options from `(key, value)` pairs of a programmer string
///
/// Recognised keys: `lib`, `speed` (kHz), `iface` (`swd`/`jtag`), `base`.
pub fn parse_options(options: &[(&str, &str)]) -> Result<JLinkOptions> {
    let mut config = JLinkOptions::default();

    for (key, value) in options {
        match *key {
            "lib" => {
                config.library = Some(PathBuf::from(value));
            }
            "speed" => {
                let speed: u32 = value
                    .parse()
                    .map_err(|_| JLinkError::InvalidParameter(format!("Invalid speed value: {}", value)))?;
                if speed == 0 {
                    return Err(JLinkError::InvalidParameter(
                        "speed must be at least 1 kHz".into(),
                    ));
                }
                config.speed_khz = speed;
            }
            "iface" => {
                config.interface = value
                    .parse()
                    .map_err(|e: flashkit_core::Error| JLinkError::InvalidParameter(e.to_string()))?;
            }
            "base" => {
                config.flash_base = parse_u32(value).ok_or_else(|| {
                    JLinkError::InvalidParameter(format!("Invalid base address: {}", value))
                })?;
            }
            _ => {
                log::warn!("jlink: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}
