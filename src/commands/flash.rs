//! Flash command implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use flashkit_core::log::Logger;
use flashkit_flash::{check_firmware, flash_device, FlashRequest, ProgrammerHandle};
use indicatif::{ProgressBar, ProgressStyle};

/// Run the flash command
///
/// Without a firmware file the attached probes are listed instead.
pub fn cmd_flash(
    firmware: Option<&Path>,
    serial: Option<u32>,
    mcu: Option<&str>,
    programmer: &str,
    logger: &Logger,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(firmware) = firmware else {
        ProgrammerHandle::print_connected(programmer)?;
        return Ok(());
    };

    let firmware = absolute(firmware);
    if let Err(e) = check_firmware(&firmware) {
        println!("To list connected devices, run: flashkit flash");
        return Err(e.into());
    }

    println!("Programmer: {}", programmer);
    if let Some(sn) = serial {
        println!("Serial: {}", sn);
    }
    println!("Firmware: {}", firmware.display());
    if let Some(mcu) = mcu {
        println!("MCU: {}", mcu);
    }
    println!();

    let request = FlashRequest::new(&firmware)
        .programmer(programmer)
        .serial(serial)
        .mcu(mcu.map(str::to_string));

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Flashing {}", firmware.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    match flash_device(&request, logger) {
        Ok(report) => {
            pb.finish_and_clear();
            match report.target {
                Some(target) => println!("Flashing {} completed successfully!", target),
                None => println!("Flashing completed successfully!"),
            }
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Flashing failed");
            Err(e.into())
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
