//! memprog-dummy - in-memory device emulators
//!
//! Bus-port implementations backed by a flat memory image, for testing
//! and development without real hardware. The flash emulator decodes the
//! same opcode sequences a real chip would see, including chip-select
//! framing across multi-call transactions, so the drivers are exercised
//! end to end.

use memprog_core::models::EepromModel;
use memprog_core::{opcodes, Error, I2cPort, Result, SpiPort};

/// Geometry of the emulated flash chip
#[derive(Debug, Clone, Copy)]
pub struct DummyFlashConfig {
    /// JEDEC ID reported by the RDID command
    pub jedec_id: u32,
    /// Flash size in bytes
    pub size: usize,
    /// Smallest erase granularity
    pub sector_size: usize,
}

impl Default for DummyFlashConfig {
    fn default() -> Self {
        Self {
            jedec_id: 0xef4018, // w25q128fv
            size: 16 * 1024 * 1024,
            sector_size: 64 * 1024,
        }
    }
}

/// Emulated SPI NOR flash behind the [`SpiPort`] capability
///
/// Reassembles chip-select-framed byte streams into commands and applies
/// them to an in-memory image. Programming can only clear bits; erase
/// sets the sector to 0xFF, as on real NOR flash.
pub struct DummyFlash {
    config: DummyFlashConfig,
    data: Vec<u8>,
    write_enabled: bool,
    in_4byte_mode: bool,
    /// Bytes shifted out since chip-select was asserted
    frame: Vec<u8>,
    /// Read cursor once a read command's header has been decoded
    read_pos: Option<usize>,
}

impl DummyFlash {
    /// Create an emulator with the given geometry, erased to 0xFF
    pub fn new(config: DummyFlashConfig) -> Self {
        log::debug!(
            "emulating {} byte flash, JEDEC {:06x}",
            config.size,
            config.jedec_id
        );
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            write_enabled: false,
            in_4byte_mode: false,
            frame: Vec::new(),
            read_pos: None,
        }
    }

    /// Create an emulator with the default geometry (w25q128fv)
    pub fn new_default() -> Self {
        Self::new(DummyFlashConfig::default())
    }

    /// The emulated memory image
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the emulated memory image
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn addr_bytes(&self) -> usize {
        if self.in_4byte_mode {
            4
        } else {
            3
        }
    }

    /// Decode the address field following the opcode in `frame`
    fn decode_addr(&self, frame: &[u8]) -> Result<usize> {
        let n = self.addr_bytes();
        if frame.len() < 1 + n {
            return Err(Error::Transport("truncated address field".into()));
        }
        let mut addr = 0usize;
        for &b in &frame[1..1 + n] {
            addr = addr << 8 | b as usize;
        }
        Ok(addr)
    }

    fn check_range(&self, addr: usize, len: usize) -> Result<()> {
        if addr + len > self.data.len() {
            return Err(Error::Transport(format!(
                "access at {addr:#x}+{len:#x} beyond emulated flash"
            )));
        }
        Ok(())
    }

    /// Apply a completed write-only frame
    fn complete_frame(&mut self) -> Result<()> {
        let frame = std::mem::take(&mut self.frame);
        let Some(&opcode) = frame.first() else {
            return Ok(());
        };
        match opcode {
            opcodes::WREN => {
                self.write_enabled = true;
                Ok(())
            }
            opcodes::RSTEN | opcodes::RST => Ok(()),
            opcodes::EN4B => {
                self.in_4byte_mode = true;
                Ok(())
            }
            opcodes::PP => {
                if !self.write_enabled {
                    return Err(Error::Transport("page program without WREN".into()));
                }
                self.write_enabled = false;
                let addr = self.decode_addr(&frame)?;
                let payload = &frame[1 + self.addr_bytes()..];
                self.check_range(addr, payload.len())?;
                // NOR programming clears bits, never sets them.
                for (i, &b) in payload.iter().enumerate() {
                    self.data[addr + i] &= b;
                }
                Ok(())
            }
            opcodes::BE_D8 => {
                if !self.write_enabled {
                    return Err(Error::Transport("erase without WREN".into()));
                }
                self.write_enabled = false;
                let addr = self.decode_addr(&frame)?;
                let sector = self.config.sector_size;
                let base = addr & !(sector - 1);
                self.check_range(base, sector)?;
                self.data[base..base + sector].fill(0xFF);
                Ok(())
            }
            other => Err(Error::Transport(format!(
                "unsupported opcode {other:#04x}"
            ))),
        }
    }
}

impl SpiPort for DummyFlash {
    fn write(&mut self, data: &[u8], start: bool, stop: bool) -> Result<()> {
        if start {
            self.frame.clear();
            self.read_pos = None;
        }
        self.frame.extend_from_slice(data);
        if stop {
            self.complete_frame()?;
        }
        Ok(())
    }

    fn exchange(&mut self, command: &[u8], read_buf: &mut [u8]) -> Result<()> {
        match command[0] {
            opcodes::RDID => {
                let id = self.config.jedec_id;
                read_buf.copy_from_slice(&[(id >> 16) as u8, (id >> 8) as u8, id as u8]);
            }
            opcodes::RDSR => {
                // Program/erase complete instantly in memory.
                read_buf[0] = 0;
            }
            other => {
                return Err(Error::Transport(format!(
                    "unsupported exchange opcode {other:#04x}"
                )))
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _start: bool, stop: bool) -> Result<()> {
        let pos = match self.read_pos {
            Some(pos) => pos,
            None => {
                // First continuation after the command header.
                if self.frame.first() != Some(&opcodes::READ) {
                    return Err(Error::Transport("read continuation without READ".into()));
                }
                let frame = std::mem::take(&mut self.frame);
                self.decode_addr(&frame)?
            }
        };

        self.check_range(pos, buf.len())?;
        buf.copy_from_slice(&self.data[pos..pos + buf.len()]);
        self.read_pos = Some(pos + buf.len());

        if stop {
            self.read_pos = None;
        }
        Ok(())
    }

    fn delay_us(&mut self, _us: u32) {}
}

/// Emulated I2C EEPROM behind the [`I2cPort`] capability
///
/// Writes wrap within the page of the starting offset, as real 24-series
/// parts do, so a driver that lets a transaction cross a page boundary
/// corrupts the image instead of silently passing.
pub struct DummyEeprom {
    model: &'static EepromModel,
    data: Vec<u8>,
}

impl DummyEeprom {
    /// Create an emulator for a registered model, zero-filled
    pub fn new(model: &str) -> Result<Self> {
        let model =
            EepromModel::lookup(model).ok_or_else(|| Error::UnsupportedModel(model.into()))?;
        Ok(Self {
            model,
            data: vec![0; model.size as usize],
        })
    }

    /// The emulated memory image
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl I2cPort for DummyEeprom {
    fn read_from(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        let offset = offset as usize;
        if offset + buf.len() > self.data.len() {
            return Err(Error::Transport("read beyond emulated EEPROM".into()));
        }
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_to(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Err(Error::Transport("write beyond emulated EEPROM".into()));
        }
        let page = self.model.page as usize;
        let base = offset - offset % page;
        for (i, &b) in data.iter().enumerate() {
            // Address counter wraps within the current page.
            self.data[base + (offset - base + i) % page] = b;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memprog_core::{AddrWidth, Eeprom, SpiFlash};

    #[test]
    fn flash_probe_selects_model_from_jedec_id() {
        let dev = SpiFlash::new(DummyFlash::new_default()).unwrap();
        assert_eq!(dev.model().name, "w25q128fv");
        assert_eq!(dev.addr_width(), AddrWidth::ThreeByte);
    }

    #[test]
    fn large_flash_uses_4byte_addressing() {
        let config = DummyFlashConfig {
            jedec_id: 0xc2201b,
            size: 128 * 1024 * 1024,
            sector_size: 64 * 1024,
        };
        let dev = SpiFlash::new(DummyFlash::new(config)).unwrap();
        assert_eq!(dev.model().name, "mx66l1g45g");
        assert_eq!(dev.addr_width(), AddrWidth::FourByte);

        // Round-trip far above the 16 MiB line.
        let mut dev = dev;
        let data: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        let offset = 100 * 1024 * 1024 + 17;
        dev.program(&mut data.as_slice(), offset, data.len() as u64)
            .unwrap();
        let mut out = Vec::new();
        dev.read(&mut out, offset, data.len() as u64).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn flash_round_trip_at_odd_offsets() {
        let mut dev = SpiFlash::new(DummyFlash::new_default()).unwrap();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 256) as u8).collect();
        dev.program(&mut data.as_slice(), 0x12345, data.len() as u64)
            .unwrap();

        let mut out = Vec::new();
        dev.read(&mut out, 0x12345, data.len() as u64).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn erase_restores_blank_state() {
        let mut dev = SpiFlash::new(DummyFlash::new_default()).unwrap();
        let data = vec![0u8; 0x20000];
        dev.program(&mut data.as_slice(), 0x10000, data.len() as u64)
            .unwrap();

        dev.erase(0x10000, 0x20000).unwrap();

        let image = dev.into_port();
        assert!(image.data()[0x10000..0x30000].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn erase_only_touches_named_sectors() {
        let mut dev = SpiFlash::new(DummyFlash::new_default()).unwrap();
        let data = vec![0x11u8; 0x30000];
        dev.program(&mut data.as_slice(), 0x10000, data.len() as u64)
            .unwrap();

        dev.erase(0x20000, 0x10000).unwrap();

        let image = dev.into_port();
        assert!(image.data()[0x10000..0x20000].iter().all(|&b| b == 0x11));
        assert!(image.data()[0x20000..0x30000].iter().all(|&b| b == 0xFF));
        assert!(image.data()[0x30000..0x40000].iter().all(|&b| b == 0x11));
    }

    #[test]
    fn eeprom_round_trip_across_pages() {
        // The page-wrap emulation makes any boundary-crossing write
        // visible as corruption here.
        let mut dev = Eeprom::new(DummyEeprom::new("24c02").unwrap(), "24c02").unwrap();
        let data: Vec<u8> = (0..200).map(|i| i as u8).collect();
        dev.write(&mut data.as_slice(), 10, data.len()).unwrap();

        let mut out = Vec::new();
        dev.read(&mut out, 10, data.len()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn eeprom_page_wrap_catches_boundary_crossings() {
        let mut port = DummyEeprom::new("24c02").unwrap();
        // A raw 4-byte write starting at 14 wraps back to 0 within the
        // first page rather than reaching offset 16.
        port.write_to(14, &[1, 2, 3, 4]).unwrap();
        assert_eq!(port.data()[14], 1);
        assert_eq!(port.data()[15], 2);
        assert_eq!(port.data()[0], 3);
        assert_eq!(port.data()[1], 4);
        assert_eq!(port.data()[16], 0);
    }
}
