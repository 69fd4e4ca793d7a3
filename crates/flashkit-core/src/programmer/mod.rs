//! Programmer traits and shared constants

mod traits;

pub use traits::{DebugTransport, Interface, Programmer, RttControl};

/// Flash base address of STM32 parts
pub const DEFAULT_FLASH_BASE: u32 = 0x0800_0000;

/// Generic core used when the target cannot be identified
pub const FALLBACK_CORE: &str = "Cortex-M4";

/// Terminal channel used for RTT reads and writes
pub const RTT_TERMINAL_CHANNEL: u32 = 0;
