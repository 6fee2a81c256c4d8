//! Flash command implementations

use std::path::Path;
use std::time::Duration;

use indicatif::ProgressBar;
use memprog_core::{SpiFlash, SpiPort, Timeouts};
use memprog_dummy::DummyFlash;
use memprog_ftdi::{FtdiSpi, Hardware, SpiConfig};

use super::{byte_progress, open_sink, open_source, PortSpec};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Options shared by all flash subcommands
pub struct FlashArgs {
    /// SPI clock frequency in Hz
    pub frequency: Option<u32>,
    /// SPI mode (0-3)
    pub mode: u8,
    /// Chip select line (0-4)
    pub chip_select: u8,
    /// Completion budget override in seconds
    pub timeout: Option<u32>,
}

/// Open the port and identify the attached chip
fn open_flash(
    spec: &PortSpec,
    hardware: Hardware,
    args: &FlashArgs,
) -> Result<SpiFlash<Box<dyn SpiPort>>, Box<dyn std::error::Error>> {
    let port: Box<dyn SpiPort> = match spec {
        PortSpec::Dummy => Box::new(DummyFlash::new_default()),
        PortSpec::Ftdi(options) => {
            let mut config = SpiConfig {
                options: options.clone(),
                mode: args.mode,
                cs: args.chip_select,
                hardware,
            };
            if let Some(hz) = args.frequency {
                config = config.frequency(hz)?;
            }
            Box::new(FtdiSpi::open(&config)?)
        }
    };

    let mut flash = SpiFlash::new(port)?;
    if let Some(secs) = args.timeout {
        let budget_us = secs.saturating_mul(1_000_000);
        flash = flash.with_timeouts(Timeouts {
            program_timeout_us: budget_us,
            erase_timeout_us: budget_us,
            ..Timeouts::default()
        });
    }
    Ok(flash)
}

/// Run the flash read command
pub fn run_read(
    spec: &PortSpec,
    hardware: Hardware,
    args: &FlashArgs,
    offset: u32,
    count: u32,
    dst: Option<&Path>,
) -> CmdResult {
    let mut flash = open_flash(spec, hardware, args)?;
    let sink = open_sink(dst)?;

    let pb = byte_progress(count as u64)?;
    let mut sink = pb.wrap_write(sink);
    flash.read(&mut sink, offset, count as u64)?;
    pb.finish_with_message("Read complete");

    Ok(())
}

/// Run the flash write command
pub fn run_write(
    spec: &PortSpec,
    hardware: Hardware,
    args: &FlashArgs,
    offset: u32,
    count: u32,
    src: Option<&Path>,
) -> CmdResult {
    let mut flash = open_flash(spec, hardware, args)?;
    let source = open_source(src)?;

    let pb = byte_progress(count as u64)?;
    let mut source = pb.wrap_read(source);
    flash.program(&mut source, offset, count as u64)?;
    pb.finish_with_message("Write complete");

    Ok(())
}

/// Run the flash erase command
pub fn run_erase(
    spec: &PortSpec,
    hardware: Hardware,
    args: &FlashArgs,
    offset: u32,
    count: u32,
) -> CmdResult {
    let mut flash = open_flash(spec, hardware, args)?;

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Erasing {:#x}+{:#x}", offset, count));
    pb.enable_steady_tick(Duration::from_millis(120));
    flash.erase(offset, count as u64)?;
    pb.finish_with_message("Erase complete");

    Ok(())
}
