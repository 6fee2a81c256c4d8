//! memprog - I2C EEPROM and SPI NOR flash programmer
//!
//! Drives 24-series I2C EEPROMs and JEDEC SPI NOR flash chips through
//! FTDI MPSSE adapters (FT2232H family), or against in-memory emulated
//! devices for trying the tool without hardware.
//!
//! The layering mirrors the workspace: `memprog-core` holds the model
//! registries and device drivers behind bus-port traits, `memprog-ftdi`
//! and `memprog-dummy` implement those traits, and this binary only
//! parses arguments, opens the right port, and streams data.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, EepromCommands, FlashCommands};
use commands::flash::FlashArgs;
use memprog_ftdi::Hardware;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Verbosity sets the default filter; RUST_LOG still overrides
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli::log_filter(cli.verbose)),
    )
    .init();

    let spec = commands::parse_port(&cli.port)?;
    let hardware = Hardware::parse(&cli.hardware).ok_or_else(|| {
        format!(
            "Unknown hardware '{}'. Valid values: generic, busblaster",
            cli.hardware
        )
    })?;

    match cli.command {
        Commands::Eeprom { model, command } => match command {
            EepromCommands::Read {
                address,
                offset,
                count,
                dst,
            } => commands::eeprom::run_read(
                &spec,
                hardware,
                &model,
                address,
                offset,
                count,
                dst.as_deref(),
            ),
            EepromCommands::Write {
                address,
                offset,
                count,
                src,
            } => commands::eeprom::run_write(
                &spec,
                hardware,
                &model,
                address,
                offset,
                count,
                src.as_deref(),
            ),
        },
        Commands::Flash {
            frequency,
            mode,
            chip_select,
            timeout,
            command,
        } => {
            let args = FlashArgs {
                frequency,
                mode,
                chip_select,
                timeout,
            };
            match command {
                FlashCommands::Read { offset, count, dst } => {
                    commands::flash::run_read(&spec, hardware, &args, offset, count, dst.as_deref())
                }
                FlashCommands::Write { offset, count, src } => commands::flash::run_write(
                    &spec,
                    hardware,
                    &args,
                    offset,
                    count,
                    src.as_deref(),
                ),
                FlashCommands::Erase { offset, count } => {
                    commands::flash::run_erase(&spec, hardware, &args, offset, count)
                }
            }
        }
    }
}
