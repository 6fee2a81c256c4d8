//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Default log filter for a `-v` count
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[derive(Parser)]
#[command(name = "memprog")]
#[command(author, version, about = "I2C EEPROM and SPI NOR flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Bus port: "ftdi[:key=value,...]" or "dummy"
    #[arg(short, long, global = true, default_value = "ftdi")]
    pub port: String,

    /// Board-level quirk (generic, busblaster)
    #[arg(long, global = true, default_value = "generic")]
    pub hardware: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// I2C EEPROM operations
    Eeprom {
        /// EEPROM model
        #[arg(short = 'M', long, global = true, default_value = "24c02")]
        model: String,

        #[command(subcommand)]
        command: EepromCommands,
    },

    /// SPI NOR flash operations
    Flash {
        /// SPI clock frequency in Hz
        #[arg(short = 'F', long, global = true, value_parser = parse_hex_u32)]
        frequency: Option<u32>,

        /// SPI mode (0-3)
        #[arg(short = 'M', long, global = true, default_value_t = 0)]
        mode: u8,

        /// Chip select line: 0 is the CS pin, 1-4 are GPIOL0-GPIOL3
        #[arg(short = 'C', long, global = true, default_value_t = 0)]
        chip_select: u8,

        /// Program/erase completion budget in seconds
        #[arg(long, global = true)]
        timeout: Option<u32>,

        #[command(subcommand)]
        command: FlashCommands,
    },
}

#[derive(Subcommand)]
pub enum EepromCommands {
    /// Read device contents to a file or stdout
    Read {
        /// 7-bit I2C slave address (hex or decimal)
        #[arg(value_parser = parse_hex_u32)]
        address: u32,

        /// Start offset within the device
        #[arg(value_parser = parse_hex_u32)]
        offset: u32,

        /// Number of bytes to read
        #[arg(value_parser = parse_hex_u32)]
        count: u32,

        /// Destination file (stdout when omitted)
        dst: Option<PathBuf>,
    },

    /// Write a file or stdin to the device
    Write {
        /// 7-bit I2C slave address (hex or decimal)
        #[arg(value_parser = parse_hex_u32)]
        address: u32,

        /// Start offset within the device
        #[arg(value_parser = parse_hex_u32)]
        offset: u32,

        /// Number of bytes to write
        #[arg(value_parser = parse_hex_u32)]
        count: u32,

        /// Source file (stdin when omitted)
        src: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum FlashCommands {
    /// Read flash contents to a file or stdout
    Read {
        /// Start offset within the chip
        #[arg(value_parser = parse_hex_u32)]
        offset: u32,

        /// Number of bytes to read
        #[arg(value_parser = parse_hex_u32)]
        count: u32,

        /// Destination file (stdout when omitted)
        dst: Option<PathBuf>,
    },

    /// Program a file or stdin into the flash
    Write {
        /// Start offset within the chip
        #[arg(value_parser = parse_hex_u32)]
        offset: u32,

        /// Number of bytes to program
        #[arg(value_parser = parse_hex_u32)]
        count: u32,

        /// Source file (stdin when omitted)
        src: Option<PathBuf>,
    },

    /// Erase a sector-aligned range
    Erase {
        /// Start offset, a multiple of the sector size
        #[arg(value_parser = parse_hex_u32)]
        offset: u32,

        /// Number of bytes, a multiple of the sector size
        #[arg(value_parser = parse_hex_u32)]
        count: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_hex_u32("0x10000").unwrap(), 0x10000);
        assert_eq!(parse_hex_u32("0X2a").unwrap(), 42);
        assert_eq!(parse_hex_u32("256").unwrap(), 256);
        assert!(parse_hex_u32("0xzz").is_err());
        assert!(parse_hex_u32("ten").is_err());
    }

    #[test]
    fn verbosity_maps_to_log_filter() {
        assert_eq!(log_filter(0), "info");
        assert_eq!(log_filter(1), "debug");
        assert_eq!(log_filter(2), "trace");
        assert_eq!(log_filter(7), "trace");
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
