//! SPI bus port over the MPSSE engine
//!
//! Chip select is an ordinary GPIO driven through `SET_BITS_LOW`, which
//! is what lets a transaction stay open across several transfer calls:
//! the flash read path sends the opcode and address with CS held, then
//! clocks the payload in with follow-up reads before releasing the line.

use std::time::Duration;

use ftdi::Device;
use memprog_core::{Error as CoreError, Result as CoreResult, SpiPort};

use crate::device::{check_divisor, divisor_for_frequency, open_mpsse, recv, send, PortOptions};
use crate::error::{FtdiError, Result};
use crate::protocol::*;

/// Default clock divisor (10 MHz at the 60 MHz base clock)
const DEFAULT_DIVISOR: u16 = 6;

/// Configuration for opening an SPI port
#[derive(Debug, Clone)]
pub struct SpiConfig {
    /// Device type and channel, from the port option string
    pub options: PortOptions,
    /// SPI mode (0-3)
    pub mode: u8,
    /// Chip select line: 0 is the CS pin, 1-4 are GPIOL0-GPIOL3
    pub cs: u8,
    /// Board-level quirks
    pub hardware: Hardware,
}

impl Default for SpiConfig {
    fn default() -> Self {
        SpiConfig {
            options: PortOptions::default(),
            mode: 0,
            cs: 0,
            hardware: Hardware::Generic,
        }
    }
}

impl SpiConfig {
    /// Set the clock frequency in Hz, overriding any divisor from the
    /// port options
    pub fn frequency(mut self, hz: u32) -> Result<Self> {
        self.options.divisor = Some(divisor_for_frequency(hz)?);
        Ok(self)
    }
}

/// FTDI MPSSE SPI port
pub struct FtdiSpi {
    device: Device,
    /// The chip-select output bit, high when idle
    cs_bits: u8,
    /// Output levels for aux pins plus the clock idle level
    idle_bits: u8,
    /// Pin direction (outputs)
    pindir: u8,
    /// MPSSE opcode for clocking bytes out in the configured mode
    write_op: u8,
    /// MPSSE opcode for clocking bytes in
    read_op: u8,
}

impl FtdiSpi {
    /// Open an FTDI channel and configure the MPSSE for SPI
    pub fn open(config: &SpiConfig) -> Result<Self> {
        if config.mode > 3 {
            return Err(FtdiError::InvalidParameter(format!(
                "Invalid SPI mode {}: must be 0-3",
                config.mode
            )));
        }
        if config.cs > 4 {
            return Err(FtdiError::InvalidParameter(format!(
                "Invalid chip select {}: must be 0-4",
                config.cs
            )));
        }

        let divisor = check_divisor(config.options.divisor.unwrap_or(DEFAULT_DIVISOR))?;

        // Modes 0 and 3 shift out on the falling edge and sample on the
        // rising edge; modes 1 and 2 are the opposite. Modes 2 and 3
        // idle the clock high.
        let (write_op, read_op) = match config.mode {
            0 | 3 => (MPSSE_DO_WRITE | MPSSE_WRITE_NEG, MPSSE_DO_READ),
            _ => (MPSSE_DO_WRITE, MPSSE_DO_READ | MPSSE_READ_NEG),
        };
        let clock_idle = if config.mode >= 2 { 1 << PIN_SK } else { 0 };

        let cs_bits = 1 << (PIN_CS + config.cs);
        let pindir = (1 << PIN_SK)
            | (1 << PIN_DO)
            | cs_bits
            | config.hardware.extra_pindir();
        let idle_bits = clock_idle | config.hardware.extra_bits();

        let device = open_mpsse(config.options.device_type, config.options.channel)?;

        let mut spi = FtdiSpi {
            device,
            cs_bits,
            idle_bits,
            pindir,
            write_op,
            read_op,
        };
        spi.init_mpsse(divisor)?;

        log::info!(
            "FTDI {} channel {} configured for SPI mode {} at {:.2} MHz",
            config.options.device_type.name(),
            config.options.channel.letter(),
            config.mode,
            60.0 / divisor as f64
        );

        Ok(spi)
    }

    fn init_mpsse(&mut self, divisor: u16) -> Result<()> {
        let divisor_val = divisor / 2 - 1;
        let buf = [
            // 60 MHz base clock on all supported parts
            DIS_DIV_5,
            TCK_DIVISOR,
            (divisor_val & 0xFF) as u8,
            (divisor_val >> 8) as u8,
            LOOPBACK_END,
            // Idle state: CS deasserted (high), clock at its idle level
            SET_BITS_LOW,
            self.cs_bits | self.idle_bits,
            self.pindir,
        ];
        send(&mut self.device, &buf)
    }

    fn push_cs(&self, buf: &mut Vec<u8>, asserted: bool) {
        let cs = if asserted { 0 } else { self.cs_bits };
        buf.extend_from_slice(&[SET_BITS_LOW, cs | self.idle_bits, self.pindir]);
    }

    fn write_frames(&mut self, data: &[u8], start: bool, stop: bool) -> Result<()> {
        let mut buf = Vec::with_capacity(data.len() + 16);
        if start {
            self.push_cs(&mut buf, true);
        }
        for chunk in data.chunks(MAX_TRANSFER) {
            buf.push(self.write_op);
            buf.push(((chunk.len() - 1) & 0xFF) as u8);
            buf.push(((chunk.len() - 1) >> 8) as u8);
            buf.extend_from_slice(chunk);
        }
        if stop {
            self.push_cs(&mut buf, false);
        }
        if buf.is_empty() {
            return Ok(());
        }
        send(&mut self.device, &buf)
    }

    fn read_frames(&mut self, data: &mut [u8], start: bool, stop: bool) -> Result<()> {
        if data.is_empty() {
            let mut buf = Vec::with_capacity(8);
            if start {
                self.push_cs(&mut buf, true);
            }
            if stop {
                self.push_cs(&mut buf, false);
            }
            if !buf.is_empty() {
                send(&mut self.device, &buf)?;
            }
            return Ok(());
        }

        let total = data.len();
        let mut done = 0;
        for chunk in data.chunks_mut(MAX_TRANSFER) {
            let mut buf = Vec::with_capacity(16);
            if start && done == 0 {
                self.push_cs(&mut buf, true);
            }
            buf.push(self.read_op);
            buf.push(((chunk.len() - 1) & 0xFF) as u8);
            buf.push(((chunk.len() - 1) >> 8) as u8);
            done += chunk.len();
            if stop && done == total {
                self.push_cs(&mut buf, false);
            }
            buf.push(SEND_IMMEDIATE);
            send(&mut self.device, &buf)?;
            recv(&mut self.device, chunk)?;
        }
        Ok(())
    }

    fn transfer(&mut self, command: &[u8], read_buf: &mut [u8]) -> Result<()> {
        let mut buf = Vec::with_capacity(command.len() + 16);
        self.push_cs(&mut buf, true);
        if !command.is_empty() {
            buf.push(self.write_op);
            buf.push(((command.len() - 1) & 0xFF) as u8);
            buf.push(((command.len() - 1) >> 8) as u8);
            buf.extend_from_slice(command);
        }
        if !read_buf.is_empty() {
            buf.push(self.read_op);
            buf.push(((read_buf.len() - 1) & 0xFF) as u8);
            buf.push(((read_buf.len() - 1) >> 8) as u8);
        }
        self.push_cs(&mut buf, false);
        buf.push(SEND_IMMEDIATE);
        send(&mut self.device, &buf)?;
        if !read_buf.is_empty() {
            recv(&mut self.device, read_buf)?;
        }
        Ok(())
    }

    /// Release I/O pins (set all as inputs)
    fn release_pins(&mut self) -> Result<()> {
        let buf = [SET_BITS_LOW, 0x00, 0x00];
        send(&mut self.device, &buf)
    }
}

impl Drop for FtdiSpi {
    fn drop(&mut self) {
        if let Err(e) = self.release_pins() {
            log::warn!("Failed to release pins on close: {}", e);
        }
    }
}

impl SpiPort for FtdiSpi {
    fn write(&mut self, data: &[u8], start: bool, stop: bool) -> CoreResult<()> {
        self.write_frames(data, start, stop).map_err(CoreError::from)
    }

    fn exchange(&mut self, command: &[u8], read_buf: &mut [u8]) -> CoreResult<()> {
        self.transfer(command, read_buf).map_err(CoreError::from)
    }

    fn read(&mut self, buf: &mut [u8], start: bool, stop: bool) -> CoreResult<()> {
        self.read_frames(buf, start, stop).map_err(CoreError::from)
    }

    fn delay_us(&mut self, us: u32) {
        // The MPSSE has no arbitrary-delay command; host-side sleep is
        // coarse but the poll budgets account for that
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_mode_and_cs() {
        let config = SpiConfig {
            mode: 4,
            ..SpiConfig::default()
        };
        assert!(FtdiSpi::open(&config).is_err());

        let config = SpiConfig {
            cs: 5,
            ..SpiConfig::default()
        };
        assert!(FtdiSpi::open(&config).is_err());
    }

    #[test]
    fn frequency_sets_divisor() {
        let config = SpiConfig::default().frequency(15_000_000).unwrap();
        assert_eq!(config.options.divisor, Some(4));
    }
}
