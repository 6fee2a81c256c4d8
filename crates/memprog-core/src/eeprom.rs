//! I2C EEPROM driver
//!
//! Reads pass straight through to the bus port; writes are decomposed
//! into page-respecting transactions. The driver keeps no state between
//! calls beyond the resolved model.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::models::EepromModel;
use crate::port::I2cPort;
use crate::stream;

/// Handle to one EEPROM behind an exclusively owned bus port
pub struct Eeprom<P: I2cPort> {
    port: P,
    model: &'static EepromModel,
}

impl<P: I2cPort> Eeprom<P> {
    /// Bind a port to a registered model
    ///
    /// Fails with [`Error::UnsupportedModel`] for an unknown name.
    pub fn new(port: P, model: &str) -> Result<Self> {
        let model =
            EepromModel::lookup(model).ok_or_else(|| Error::UnsupportedModel(model.into()))?;
        log::debug!(
            "EEPROM {}: {} bytes, {} byte pages",
            model.name,
            model.size,
            model.page
        );
        Ok(Self { port, model })
    }

    /// The resolved model descriptor
    pub fn model(&self) -> &'static EepromModel {
        self.model
    }

    /// Consume the handle, releasing the bus port
    pub fn into_port(self) -> P {
        self.port
    }

    fn check_bounds(&self, offset: u32, count: usize) -> Result<()> {
        let end = (offset as u64) + (count as u64);
        if end > self.model.size as u64 {
            return Err(Error::OutOfBounds {
                offset,
                count: count as u32,
                size: self.model.size,
            });
        }
        Ok(())
    }

    /// Read `count` bytes starting at `offset` into `sink`
    ///
    /// Performs exactly one bus transaction; EEPROM sequential reads have
    /// no length limit, so no chunking is needed.
    pub fn read<W: Write + ?Sized>(&mut self, sink: &mut W, offset: u32, count: usize) -> Result<()> {
        self.check_bounds(offset, count)?;

        let mut buf = vec![0u8; count];
        self.port.read_from(offset, &mut buf)?;
        sink.write_all(&buf)?;
        Ok(())
    }

    /// Write `count` bytes from `source` starting at `offset`
    ///
    /// Decomposes the request into page-bounded transactions: a partial
    /// head page up to the next page boundary, full pages, then a
    /// partial-or-full tail. Each chunk is read from `source` immediately
    /// before it is written; a source that ends early fails with
    /// [`Error::Underrun`].
    pub fn write<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        offset: u32,
        count: usize,
    ) -> Result<()> {
        self.check_bounds(offset, count)?;

        let page = self.model.page;
        let mut buf = vec![0u8; page as usize];
        let mut offset = offset;
        let mut remaining = count;

        while remaining > 0 {
            let room = (page - offset % page) as usize;
            let chunk = remaining.min(room);

            stream::fill_exact(source, &mut buf[..chunk])?;
            log::trace!("page write: {} bytes at {:#x}", chunk, offset);
            self.port.write_to(offset, &buf[..chunk])?;

            offset += chunk as u32;
            remaining -= chunk;
        }

        Ok(())
    }
}
