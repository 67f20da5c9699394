//! Device info command implementation.

use anyhow::Result;
use console::style;
use escape32::{BootloaderInfo, FirmwareInfo, RunConfig};

use super::connect;
use crate::Cli;

/// Info command implementation.
pub(crate) fn cmd_info(cli: &Cli, config: &RunConfig) -> Result<()> {
    let mut session = connect(cli, config)?;

    if !cli.quiet {
        eprintln!("{} Fetching ESCape32 info...", style("ℹ").blue());
    }
    let bootloader = session.query_bootloader_info()?;
    println!("{}", render_bootloader(&bootloader));

    let firmware = session.query_firmware_info()?;
    println!("{}", render_firmware(firmware.as_ref()));

    session.close()?;
    Ok(())
}

fn render_bootloader(info: &BootloaderInfo) -> String {
    format!("Bootloader revision {}", info.revision)
}

fn render_firmware(info: Option<&FirmwareInfo>) -> String {
    match info {
        Some(fw) => format!("Firmware revision {} [{}]", fw.revision, fw.name),
        None => "Firmware not installed!".to_string(),
    }
}
