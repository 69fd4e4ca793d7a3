//! flashkit-jlink - SEGGER J-Link support
//!
//! This crate drives SEGGER J-Link debug probes through the vendor's shared
//! library (`libjlinkarm.so`, `libjlinkarm.dylib` or `JLink_x64.dll`),
//! loaded at run time.
//!
//! # Example
//!
//! ```no_run
//! use flashkit_core::log::Logger;
//! use flashkit_core::programmer::Programmer;
//! use flashkit_jlink::{JLinkOptions, JLinkProgrammer};
//!
//! let mut programmer = JLinkProgrammer::open(None, JLinkOptions::default(), Logger::default())?;
//! if programmer.connect(None) {
//!     println!("Connected to {}", programmer.target().unwrap_or("?"));
//! }
//! programmer.disconnect();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with flashkit CLI
//!
//! ```bash
//! # Flash with the default library and settings
//! flashkit flash firmware.hex
//!
//! # Use a specific library and a slower clock
//! flashkit flash firmware.hex -p jlink:lib=/opt/SEGGER/JLink/libjlinkarm.so,speed=1000
//!
//! # Flash a bootloader-offset image
//! flashkit flash app.bin -p jlink:base=0x08020000
//! ```
//!
//! # System Requirements
//!
//! - SEGGER J-Link Software and Documentation Pack installed
//! - The library on the loader search path, or `lib=`, or
//!   `FLASHKIT_JLINK_LIB` pointing at it

pub mod device;
pub mod error;
mod library;
pub mod options;
pub mod programmer;

// Re-exports
pub use device::{enumerate, JLink};
pub use error::{JLinkError, Result};
pub use library::LIBRARY_ENV;
pub use options::{parse_options, JLinkOptions, DEFAULT_SPEED_KHZ};
pub use programmer::{JLinkProgrammer, PROGRAMMER_NAME};

use flashkit_core::log::Logger;
use flashkit_core::programmer::Programmer;

/// Open a J-Link programmer and return it boxed
///
/// This is a convenience function for use in the CLI programmer dispatch.
///
/// # Example Options
///
/// - `lib=/path/to/libjlinkarm.so` - Optional: library location
/// - `speed=4000` - Optional: interface clock in kHz (default: 4000)
/// - `iface=swd` - Optional: `swd` or `jtag` (default: swd)
/// - `base=0x08000000` - Optional: flash base address
pub fn open_jlink(
    options: &[(&str, &str)],
    serial: Option<u32>,
    logger: Logger,
) -> std::result::Result<Box<dyn Programmer>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let programmer = JLinkProgrammer::open(serial, config, logger)?;
    Ok(Box::new(programmer))
}
