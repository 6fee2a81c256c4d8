//! I2C bus port over the MPSSE engine
//!
//! Bit-banged open-drain I2C using 3-phase data clocking. SCL is the SK
//! pin (ADBUS0); SDA needs DO (ADBUS1) and DI (ADBUS2) tied together
//! with a pull-up. DO drives SDA low, DI senses the line, and releasing
//! SDA means turning DO back into an input.

use std::time::Duration;

use ftdi::Device;
use memprog_core::{I2cPort, Result as CoreResult};

use crate::device::{check_divisor, open_mpsse, recv, send, PortOptions};
use crate::error::{FtdiError, Result};
use crate::protocol::*;

/// Default I2C clock frequency (standard mode)
const DEFAULT_FREQUENCY: u32 = 100_000;

/// Probe budget for the post-write acknowledge poll. 24-series parts
/// specify a 5 ms internal write cycle; 100 probes at 1 ms is generous.
const ACK_POLL_LIMIT: u32 = 100;

/// SK=1, DO=1 (SCL and SDA both released high)
const VAL_IDLE: u8 = 0x03;
/// SK=1, DO=0 (SDA pulled low while SCL is high)
const VAL_SDA_LOW: u8 = 0x01;
/// SK=0, DO=0
const VAL_BOTH_LOW: u8 = 0x00;

/// Configuration for opening an I2C port
#[derive(Debug, Clone)]
pub struct I2cConfig {
    /// Device type and channel, from the port option string
    pub options: PortOptions,
    /// Bus clock frequency in Hz
    pub frequency: u32,
    /// Board-level quirks
    pub hardware: Hardware,
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfig {
            options: PortOptions::default(),
            frequency: DEFAULT_FREQUENCY,
            hardware: Hardware::Generic,
        }
    }
}

/// FTDI MPSSE I2C port bound to one memory device
pub struct FtdiI2c {
    device: Device,
    /// 7-bit slave address
    address: u8,
    /// Word-address bytes the device expects (1 or 2)
    addr_bytes: u8,
    /// Direction mask when driving SDA (SK and DO outputs)
    dir_sda_out: u8,
    /// Direction mask when releasing SDA for reads and ACK sense
    dir_sda_in: u8,
    /// Output levels for quirk pins, folded into every SET_BITS value
    extra_val: u8,
}

/// Divisor for an I2C clock frequency. With 3-phase clocking each bit
/// takes 1.5 MPSSE clock periods, so SCL runs at 40 MHz / divisor.
fn i2c_divisor(hz: u32) -> Result<u16> {
    if hz == 0 {
        return Err(FtdiError::InvalidParameter(
            "Frequency must be non-zero".to_string(),
        ));
    }
    let mut divisor = 40_000_000u32.div_ceil(hz);
    if divisor % 2 != 0 {
        divisor += 1;
    }
    Ok(divisor.clamp(2, 65534) as u16)
}

impl FtdiI2c {
    /// Open an FTDI channel and configure the MPSSE for I2C, bound to
    /// the slave at `address` expecting `addr_bytes` word-address bytes
    pub fn open(config: &I2cConfig, address: u8, addr_bytes: u8) -> Result<Self> {
        if address > 0x7F {
            return Err(FtdiError::InvalidParameter(format!(
                "Invalid I2C address {:#x}: must be 7-bit",
                address
            )));
        }
        if addr_bytes == 0 || addr_bytes > 2 {
            return Err(FtdiError::InvalidParameter(format!(
                "Invalid word-address width {}: must be 1 or 2",
                addr_bytes
            )));
        }

        let divisor = match config.options.divisor {
            Some(d) => check_divisor(d)?,
            None => i2c_divisor(config.frequency)?,
        };

        let extra_dir = config.hardware.extra_pindir();
        let extra_val = config.hardware.extra_bits();

        let device = open_mpsse(config.options.device_type, config.options.channel)?;

        let mut i2c = FtdiI2c {
            device,
            address,
            addr_bytes,
            dir_sda_out: VAL_IDLE | extra_dir,
            dir_sda_in: VAL_SDA_LOW | extra_dir,
            extra_val,
        };
        i2c.init_mpsse(divisor)?;

        log::info!(
            "FTDI {} channel {} configured for I2C at {:.0} kHz, slave {:#04x}",
            config.options.device_type.name(),
            config.options.channel.letter(),
            40_000.0 / divisor as f64,
            address
        );

        Ok(i2c)
    }

    fn init_mpsse(&mut self, divisor: u16) -> Result<()> {
        let divisor_val = divisor / 2 - 1;
        let buf = [
            DIS_DIV_5,
            TCK_DIVISOR,
            (divisor_val & 0xFF) as u8,
            (divisor_val >> 8) as u8,
            LOOPBACK_END,
            EN_3_PHASE,
            // Bus idle: both lines released high
            SET_BITS_LOW,
            VAL_IDLE | self.extra_val,
            self.dir_sda_out,
        ];
        send(&mut self.device, &buf)
    }

    /// Generate a START (or repeated START) condition: SDA falls while
    /// SCL is high. The SET_BITS commands repeat for setup/hold timing.
    fn start(&mut self) -> Result<()> {
        let mut cmd = Vec::with_capacity(32);
        for _ in 0..4 {
            cmd.extend_from_slice(&[
                SET_BITS_LOW,
                VAL_IDLE | self.extra_val,
                self.dir_sda_out,
            ]);
        }
        for _ in 0..4 {
            cmd.extend_from_slice(&[
                SET_BITS_LOW,
                VAL_SDA_LOW | self.extra_val,
                self.dir_sda_out,
            ]);
        }
        cmd.extend_from_slice(&[
            SET_BITS_LOW,
            VAL_BOTH_LOW | self.extra_val,
            self.dir_sda_out,
        ]);
        send(&mut self.device, &cmd)
    }

    /// Generate a STOP condition: SDA rises while SCL is high
    fn stop(&mut self) -> Result<()> {
        let mut cmd = Vec::with_capacity(40);
        for _ in 0..4 {
            cmd.extend_from_slice(&[
                SET_BITS_LOW,
                VAL_BOTH_LOW | self.extra_val,
                self.dir_sda_out,
            ]);
        }
        for _ in 0..4 {
            cmd.extend_from_slice(&[
                SET_BITS_LOW,
                VAL_SDA_LOW | self.extra_val,
                self.dir_sda_out,
            ]);
        }
        for _ in 0..4 {
            cmd.extend_from_slice(&[
                SET_BITS_LOW,
                VAL_IDLE | self.extra_val,
                self.dir_sda_out,
            ]);
        }
        send(&mut self.device, &cmd)
    }

    /// Clock one byte out and sample the acknowledge bit
    fn write_byte(&mut self, byte: u8) -> Result<bool> {
        let mut cmd = Vec::with_capacity(16);

        cmd.extend_from_slice(&[
            SET_BITS_LOW,
            VAL_BOTH_LOW | self.extra_val,
            self.dir_sda_out,
        ]);

        // 8 bits out, MSB first, on the falling edge
        cmd.push(MPSSE_DO_WRITE | MPSSE_WRITE_NEG | MPSSE_BITMODE);
        cmd.push(7);
        cmd.push(byte);

        // Release SDA and read the ACK bit
        cmd.extend_from_slice(&[
            SET_BITS_LOW,
            VAL_BOTH_LOW | self.extra_val,
            self.dir_sda_in,
        ]);
        cmd.push(MPSSE_DO_READ | MPSSE_READ_NEG | MPSSE_BITMODE);
        cmd.push(0);
        cmd.push(SEND_IMMEDIATE);

        send(&mut self.device, &cmd)?;

        let mut buf = [0u8; 1];
        recv(&mut self.device, &mut buf)?;

        // ACK is the slave holding SDA low
        Ok(buf[0] & 0x01 == 0)
    }

    /// Clock one byte in, then send ACK (`true`) or NACK
    fn read_byte(&mut self, ack: bool) -> Result<u8> {
        let mut cmd = Vec::with_capacity(20);

        cmd.extend_from_slice(&[
            SET_BITS_LOW,
            VAL_BOTH_LOW | self.extra_val,
            self.dir_sda_in,
        ]);
        cmd.push(MPSSE_DO_READ | MPSSE_READ_NEG | MPSSE_BITMODE);
        cmd.push(7);

        cmd.extend_from_slice(&[
            SET_BITS_LOW,
            VAL_BOTH_LOW | self.extra_val,
            self.dir_sda_out,
        ]);
        cmd.push(MPSSE_DO_WRITE | MPSSE_WRITE_NEG | MPSSE_BITMODE);
        cmd.push(0);
        cmd.push(if ack { 0x00 } else { 0x80 });

        cmd.extend_from_slice(&[
            SET_BITS_LOW,
            VAL_BOTH_LOW | self.extra_val,
            self.dir_sda_in,
        ]);
        cmd.push(SEND_IMMEDIATE);

        send(&mut self.device, &cmd)?;

        let mut buf = [0u8; 1];
        recv(&mut self.device, &mut buf)?;
        Ok(buf[0])
    }

    /// Address byte for a write transaction
    fn addr_w(&self) -> u8 {
        self.address << 1
    }

    /// Address byte for a read transaction
    fn addr_r(&self) -> u8 {
        (self.address << 1) | 0x01
    }

    /// Emit the word address, MSB first
    fn send_offset(&mut self, offset: u32) -> Result<()> {
        let bytes = offset.to_be_bytes();
        for &b in &bytes[4 - self.addr_bytes as usize..] {
            if !self.write_byte(b)? {
                self.stop()?;
                return Err(FtdiError::Nack("word address not acknowledged"));
            }
        }
        Ok(())
    }

    /// Probe the slave until it acknowledges its address again, which is
    /// how 24-series parts signal the end of the internal write cycle
    fn ack_poll(&mut self) -> Result<()> {
        for _ in 0..ACK_POLL_LIMIT {
            self.start()?;
            let ack = self.write_byte(self.addr_w())?;
            self.stop()?;
            if ack {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Err(FtdiError::TransferFailed(format!(
            "write cycle did not complete within {} ms",
            ACK_POLL_LIMIT
        )))
    }
}

impl Drop for FtdiI2c {
    fn drop(&mut self) {
        let buf = [SET_BITS_LOW, 0x00, 0x00];
        if let Err(e) = send(&mut self.device, &buf) {
            log::warn!("Failed to release pins on close: {}", e);
        }
    }
}

impl I2cPort for FtdiI2c {
    fn read_from(&mut self, offset: u32, buf: &mut [u8]) -> CoreResult<()> {
        if buf.is_empty() {
            return Ok(());
        }

        // Dummy write to set the word address
        self.start()?;
        let addr_w = self.addr_w();
        if !self.write_byte(addr_w)? {
            self.stop()?;
            return Err(FtdiError::Nack("address not acknowledged").into());
        }
        self.send_offset(offset)?;

        // Repeated START switches to the read phase
        self.start()?;
        let addr_r = self.addr_r();
        if !self.write_byte(addr_r)? {
            self.stop()?;
            return Err(FtdiError::Nack("address not acknowledged (read phase)").into());
        }

        let last = buf.len() - 1;
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_byte(i < last)?;
        }
        self.stop()?;
        Ok(())
    }

    fn write_to(&mut self, offset: u32, data: &[u8]) -> CoreResult<()> {
        self.start()?;
        let addr_w = self.addr_w();
        if !self.write_byte(addr_w)? {
            self.stop()?;
            return Err(FtdiError::Nack("address not acknowledged").into());
        }
        self.send_offset(offset)?;

        for &byte in data {
            if !self.write_byte(byte)? {
                self.stop()?;
                return Err(FtdiError::Nack("data byte not acknowledged").into());
            }
        }
        self.stop()?;

        Ok(self.ack_poll()?)
    }
}
