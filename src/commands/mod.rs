//! Command implementations
//!
//! The core drivers speak in readers and writers; everything here is
//! plumbing around them: resolving file arguments to streams, opening
//! the right bus port backend, and drawing progress bars.

pub mod eeprom;
pub mod flash;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use memprog_ftdi::PortOptions;

/// Which bus port backend to open
pub enum PortSpec {
    /// FTDI MPSSE adapter
    Ftdi(PortOptions),
    /// In-memory emulated device
    Dummy,
}

/// Parse the `-p/--port` string: a backend name optionally followed by
/// `:key=value,...` options
pub fn parse_port(s: &str) -> Result<PortSpec, Box<dyn std::error::Error>> {
    let (name, rest) = match s.split_once(':') {
        Some((name, rest)) => (name, rest),
        None => (s, ""),
    };

    match name {
        "ftdi" => {
            let mut pairs = Vec::new();
            for kv in rest.split(',').filter(|kv| !kv.is_empty()) {
                let (key, value) = kv
                    .split_once('=')
                    .ok_or_else(|| format!("Malformed port option '{}': expected key=value", kv))?;
                pairs.push((key, value));
            }
            Ok(PortSpec::Ftdi(memprog_ftdi::parse_options(&pairs)?))
        }
        "dummy" => {
            if !rest.is_empty() {
                return Err(format!("The dummy port takes no options (got '{}')", rest).into());
            }
            log::debug!("using the emulated dummy port");
            Ok(PortSpec::Dummy)
        }
        other => Err(format!("Unknown port '{}'. Valid ports: ftdi, dummy", other).into()),
    }
}

/// Resolve an optional destination path, stdout when omitted
pub fn open_sink(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    })
}

/// Resolve an optional source path, stdin when omitted
pub fn open_source(path: Option<&Path>) -> io::Result<Box<dyn Read>> {
    Ok(match path {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    })
}

/// Byte-counting progress bar drawn to stderr
pub fn byte_progress(total: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_strings() {
        assert!(matches!(parse_port("dummy"), Ok(PortSpec::Dummy)));
        assert!(matches!(parse_port("ftdi"), Ok(PortSpec::Ftdi(_))));
        assert!(matches!(
            parse_port("ftdi:type=2232h,channel=B"),
            Ok(PortSpec::Ftdi(_))
        ));
        assert!(parse_port("ftdi:type").is_err());
        assert!(parse_port("ftdi:type=unknown").is_err());
        assert!(parse_port("dummy:foo=bar").is_err());
        assert!(parse_port("serial").is_err());
    }
}
