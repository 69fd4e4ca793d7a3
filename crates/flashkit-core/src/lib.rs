//! flashkit-core - Core library for debug-probe flashing
//!
//! This crate holds everything that does not depend on a particular debug
//! probe family:
//!
//! - [`catalog`] - device-id tables mapping silicon ID codes to families
//!   and default part numbers
//! - [`identify`] - the target identification engine (core acquisition,
//!   ID register probing, decoding)
//! - [`programmer`] - the `DebugTransport` seam towards vendor libraries and
//!   the `Programmer` lifecycle contract implemented per probe family
//! - [`log`] - the explicit logging sink handed to programmers
//!
//! # Example
//!
//! ```ignore
//! use flashkit_core::catalog::SiliconCatalog;
//! use flashkit_core::identify::{identify, IdentifyConfig};
//!
//! fn detect<T: DebugTransport>(transport: &mut T, log: &Logger) {
//!     let config = IdentifyConfig::default();
//!     match identify(transport, &config, SiliconCatalog::builtin(), log) {
//!         Some(id) => println!("Found: {} ({})", id.part_number, id.family),
//!         None => println!("Target not identified"),
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod catalog;
pub mod error;
pub mod identify;
pub mod log;
pub mod probe;
pub mod programmer;

pub use error::{Error, Result};
