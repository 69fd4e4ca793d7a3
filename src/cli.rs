//! CLI argument parsing

use clap::{Parser, Subcommand};
use flashkit_flash::{programmer_names_short, DEFAULT_PROGRAMMER};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a non-negative number of seconds
fn parse_seconds(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|e| format!("Invalid number: {}", e))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("{} is not a valid duration in seconds", s));
    }
    Ok(secs)
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "flashkit")]
#[command(author, version, about = "Flash and auto-detect Cortex-M targets through J-Link probes", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Extra silicon catalog (RON) layered over the built-in STM32 table
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Flash a firmware image, or list attached probes if none is given
    #[command(after_help = "Examples:
  flashkit flash                            List attached probes
  flashkit flash firmware.hex               Flash with the first probe
  flashkit flash firmware.hex -s 123456     Flash with a specific probe
  flashkit flash firmware.hex --mcu STM32F765ZG")]
    Flash {
        /// Firmware file (.hex, .bin, .elf)
        firmware: Option<PathBuf>,

        /// Probe serial number (first available if not given)
        #[arg(short, long)]
        serial: Option<u32>,

        /// Target name, e.g. STM32F765ZG (auto-detected if not given)
        #[arg(long)]
        mcu: Option<String>,

        /// Programmer to use
        #[arg(short, long, default_value = DEFAULT_PROGRAMMER, help = programmer_help())]
        programmer: String,
    },

    /// Stream RTT output from the target
    #[command(after_help = "Examples:
  flashkit rtt                              Read for 10 seconds
  flashkit rtt -t 0                         Read until Ctrl+C
  flashkit rtt --msg 'hello\\n'              Send a line after connecting
  flashkit rtt --no-reset -m STM32F765ZG")]
    Rtt(RttArgs),

    /// List supported programmers
    ListProgrammers,

    /// List the silicon ID catalog
    Catalog {
        /// Only show families containing this text
        #[arg(long)]
        family: Option<String>,
    },
}

/// RTT options
#[derive(clap::Args, Debug, Clone)]
pub struct RttArgs {
    /// Probe serial number (first available if not given)
    #[arg(short, long)]
    pub serial: Option<u32>,

    /// Target name, e.g. STM32F765ZG (auto-detected if not given)
    #[arg(short, long)]
    pub mcu: Option<String>,

    /// Reset the target after connecting (default)
    #[arg(long, overrides_with = "no_reset")]
    pub reset: bool,

    /// Do not reset the target after connecting
    #[arg(long, overrides_with = "reset")]
    pub no_reset: bool,

    /// Seconds to read; 0 reads until interrupted
    #[arg(short, long, default_value = "10", value_parser = parse_seconds)]
    pub timeout: f64,

    /// Message to send once connected (escapes: \n \r \t \\ \0 \xHH \' \")
    #[arg(long)]
    pub msg: Option<String>,

    /// Seconds to wait before sending the message
    #[arg(long, default_value = "0.5", value_parser = parse_seconds)]
    pub msg_timeout: f64,

    /// RTT control block address (searched for if not given)
    #[arg(long, value_parser = parse_hex_u32)]
    pub address: Option<u32>,

    /// Programmer to use
    #[arg(short, long, default_value = DEFAULT_PROGRAMMER, help = programmer_help())]
    pub programmer: String,
}

impl RttArgs {
    /// Whether to reset after connecting
    pub fn should_reset(&self) -> bool {
        !self.no_reset
    }
}
