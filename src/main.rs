//! flashkit - J-Link flashing and target auto-detection for Cortex-M parts
//!
//! # Architecture
//!
//! The binary is a thin layer over `flashkit-flash`:
//! - **flash** resolves a probe, identifies the silicon through the debug
//!   registers and programs the image, closing the session on every path
//! - **rtt** connects the same way and streams the RTT terminal channel
//!
//! The silicon catalog used for identification can be extended at runtime
//! with `--catalog <file.ron>`.

mod cli;
mod commands;

use std::path::Path;

use clap::Parser;
use cli::{Cli, Commands};
use flashkit_core::catalog::SiliconCatalog;
use flashkit_core::log::Logger;

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match cli.catalog.as_deref() {
        Some(path) => install_catalog(path)?,
        None => SiliconCatalog::shared(),
    };
    log::debug!("Silicon catalog has {} device IDs", catalog.len());

    let logger = Logger::default().level(log::max_level());

    match cli.command {
        Commands::Flash {
            firmware,
            serial,
            mcu,
            programmer,
        } => commands::cmd_flash(
            firmware.as_deref(),
            serial,
            mcu.as_deref(),
            &programmer,
            &logger,
        ),
        Commands::Rtt(args) => commands::cmd_rtt(&args, &logger),
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::Catalog { family } => {
            commands::list_catalog(&catalog, family.as_deref());
            Ok(())
        }
    }
}

/// Layer a catalog file over the built-in table and make it the process-wide catalog
fn install_catalog(path: &Path) -> Result<std::sync::Arc<SiliconCatalog>, Box<dyn std::error::Error>> {
    let extra = SiliconCatalog::load_file(path)?;
    log::info!(
        "Loaded {} device IDs from {}",
        extra.len(),
        path.display()
    );
    let merged = SiliconCatalog::builtin().merged_with(&extra);
    Ok(SiliconCatalog::install(merged)?)
}
