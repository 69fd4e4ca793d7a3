//! High-level flashing abstraction
//!
//! This crate opens programmers by name and drives them through a complete
//! flashing run. The CLI should only interact with types from this crate and
//! the catalog in `flashkit-core`, never with a probe crate directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CLI (bin/flashkit)                    │
//! │  - Only imports flashkit-flash and flashkit-core (catalog)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     flashkit-flash (this crate)              │
//! │  - ProgrammerHandle: owns a programmer, disconnects on drop  │
//! │  - Registry: opens programmers by name, lists probes         │
//! │  - Orchestrator: probe, connect, flash, reset, disconnect    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │    flashkit-core         │   │  Probe crates            │
//! │  - Programmer trait      │   │  - jlink, dummy          │
//! │  - Identification        │   │  - Implement             │
//! │  - Silicon catalog       │   │    DebugTransport        │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use flashkit_core::log::Logger;
//! use flashkit_flash::{flash_device, FlashRequest};
//!
//! let request = FlashRequest::new("firmware.hex").serial(Some(123456));
//! let report = flash_device(&request, &Logger::default())?;
//! println!("Flashed {}", report.target.as_deref().unwrap_or("target"));
//! # Ok::<(), flashkit_flash::FlashError>(())
//! ```

mod error;
mod handle;
mod orchestrator;
mod registry;

pub use error::{FlashError, Result};
pub use handle::ProgrammerHandle;
pub use orchestrator::{
    check_firmware, flash_device, flash_device_by_usb, run_flash_sequence, select_probe,
    FlashReport, FlashRequest,
};
pub use registry::{
    available_programmers, find_programmer, list_probes, open_programmer,
    parse_programmer_params, programmer_names_short, ProgrammerInfo, ProgrammerParams,
    DEFAULT_PROGRAMMER,
};

// Re-export core types that the CLI needs
pub use flashkit_core::probe::ProbeInfo;
pub use flashkit_core::programmer::{Programmer, RttControl};
