//! Shared FTDI device bring-up
//!
//! Opening, USB reset, latency and MPSSE bitmode setup are identical for
//! the SPI and I2C ports; only the MPSSE initialization sequence differs.

use std::io::{Read, Write};
use std::time::Duration;

use ftdi::{find_by_vid_pid, BitMode, Device, Interface};

use crate::error::{FtdiError, Result};
use crate::protocol::{FtdiDeviceType, FtdiInterface};

/// Options common to both bus ports, parsed from the CLI port string
///
/// Format: `type=<2232h|4232h|232h|4233h>,channel=<A|B|C|D>,divisor=<N>`
#[derive(Debug, Clone, Default)]
pub struct PortOptions {
    /// Device type (determines VID/PID)
    pub device_type: FtdiDeviceType,
    /// Interface/channel to use (A, B, C, D)
    pub channel: FtdiInterface,
    /// Explicit clock divisor override (even, 2-65534)
    pub divisor: Option<u16>,
}

/// Parse port options from `key=value` pairs
pub fn parse_options(options: &[(&str, &str)]) -> Result<PortOptions> {
    let mut parsed = PortOptions::default();

    for (key, value) in options {
        match *key {
            "type" => {
                parsed.device_type = FtdiDeviceType::parse(value).ok_or_else(|| {
                    FtdiError::InvalidDeviceType(format!(
                        "Unknown device type '{}'. Valid types: 2232h, 4232h, 232h, 4233h",
                        value
                    ))
                })?;
            }
            "port" | "channel" => {
                let mut chars = value.chars();
                let channel = match (chars.next(), chars.next()) {
                    (Some(c), None) => FtdiInterface::from_char(c),
                    _ => None,
                };
                parsed.channel = channel.ok_or_else(|| {
                    FtdiError::InvalidChannel(format!(
                        "Invalid channel '{}': must be A, B, C, or D",
                        value
                    ))
                })?;
            }
            "divisor" => {
                let divisor: u16 = value.parse().map_err(|_| {
                    FtdiError::InvalidParameter(format!("Invalid divisor '{}'", value))
                })?;
                parsed.divisor = Some(check_divisor(divisor)?);
            }
            _ => {
                log::warn!("Unknown FTDI option: {}={}", key, value);
            }
        }
    }

    Ok(parsed)
}

/// Validate a clock divisor
pub(crate) fn check_divisor(divisor: u16) -> Result<u16> {
    if divisor < 2 || divisor % 2 != 0 {
        return Err(FtdiError::InvalidParameter(format!(
            "Invalid divisor {}: must be even, between 2 and 65534",
            divisor
        )));
    }
    Ok(divisor)
}

/// Smallest even divisor of the 60 MHz base clock that does not exceed
/// the requested frequency
pub(crate) fn divisor_for_frequency(hz: u32) -> Result<u16> {
    if hz == 0 {
        return Err(FtdiError::InvalidParameter(
            "Frequency must be non-zero".to_string(),
        ));
    }
    let mut divisor = 60_000_000u32.div_ceil(hz);
    if divisor % 2 != 0 {
        divisor += 1;
    }
    let divisor = divisor.clamp(2, 65534) as u16;
    Ok(divisor)
}

/// Open an FTDI channel and put it in MPSSE mode
pub(crate) fn open_mpsse(device_type: FtdiDeviceType, channel: FtdiInterface) -> Result<Device> {
    if channel.index() >= device_type.channel_count() {
        return Err(FtdiError::InvalidChannel(format!(
            "Channel {} not available on {} (max: {})",
            channel.letter(),
            device_type.name(),
            (b'A' + device_type.channel_count() - 1) as char
        )));
    }

    let interface = match channel {
        FtdiInterface::A => Interface::A,
        FtdiInterface::B => Interface::B,
        FtdiInterface::C => Interface::C,
        FtdiInterface::D => Interface::D,
    };

    let vid = device_type.vendor_id();
    let pid = device_type.product_id();
    log::debug!("Looking for FTDI device VID={:04X} PID={:04X}", vid, pid);

    let mut device = find_by_vid_pid(vid, pid)
        .interface(interface)
        .open()
        .map_err(|e| FtdiError::OpenFailed(format!("{}", e)))?;

    log::debug!(
        "Opened FTDI {} channel {}",
        device_type.name(),
        channel.letter()
    );

    device
        .usb_reset()
        .map_err(|e| FtdiError::ConfigFailed(format!("USB reset failed: {}", e)))?;

    // 2 ms latency timer for responsive small reads
    device
        .set_latency_timer(2)
        .map_err(|e| FtdiError::ConfigFailed(format!("Set latency timer failed: {}", e)))?;

    device
        .set_bitmode(0x00, BitMode::Mpsse)
        .map_err(|e| FtdiError::ConfigFailed(format!("Set MPSSE mode failed: {}", e)))?;

    Ok(device)
}

/// Send an MPSSE command buffer
pub(crate) fn send(device: &mut Device, data: &[u8]) -> Result<()> {
    device
        .write_all(data)
        .map_err(|e| FtdiError::TransferFailed(format!("Write failed: {}", e)))?;
    log::trace!("Sent {} bytes", data.len());
    Ok(())
}

/// Receive exactly `buf.len()` bytes from the device
pub(crate) fn recv(device: &mut Device, buf: &mut [u8]) -> Result<()> {
    let mut total = 0;

    while total < buf.len() {
        match device.read(&mut buf[total..]) {
            Ok(0) => {
                // No data available yet, wait for the latency timer
                std::thread::sleep(Duration::from_micros(100));
            }
            Ok(n) => {
                total += n;
            }
            Err(e) => {
                return Err(FtdiError::TransferFailed(format!("Read failed: {}", e)));
            }
        }
    }

    log::trace!("Received {} bytes", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_and_channel() {
        let opts = parse_options(&[("type", "232h"), ("channel", "a")]).unwrap();
        assert_eq!(opts.device_type, FtdiDeviceType::Ft232H);
        assert_eq!(opts.channel, FtdiInterface::A);
        assert_eq!(opts.divisor, None);
    }

    #[test]
    fn rejects_bad_channel() {
        assert!(parse_options(&[("channel", "E")]).is_err());
        assert!(parse_options(&[("channel", "AB")]).is_err());
    }

    #[test]
    fn rejects_odd_divisor() {
        assert!(parse_options(&[("divisor", "3")]).is_err());
        assert!(parse_options(&[("divisor", "0")]).is_err());
        let opts = parse_options(&[("divisor", "12")]).unwrap();
        assert_eq!(opts.divisor, Some(12));
    }

    #[test]
    fn frequency_rounds_to_even_divisor() {
        assert_eq!(divisor_for_frequency(30_000_000).unwrap(), 2);
        assert_eq!(divisor_for_frequency(10_000_000).unwrap(), 6);
        assert_eq!(divisor_for_frequency(7_000_000).unwrap(), 10);
        assert_eq!(divisor_for_frequency(1_000_000).unwrap(), 60);
        // Clamped at the 16-bit divisor field
        assert_eq!(divisor_for_frequency(1).unwrap(), 65534);
        assert!(divisor_for_frequency(0).is_err());
    }
}
