//! CLI command implementations
//!
//! Commands only talk to `flashkit-flash` (registry, handle, orchestrator)
//! and to the silicon catalog in `flashkit-core`.

mod flash;
mod list;
mod rtt;

pub use flash::cmd_flash;
pub use list::{list_catalog, list_programmers};
pub use rtt::cmd_rtt;
