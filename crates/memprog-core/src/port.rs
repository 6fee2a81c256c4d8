//! Bus port capability traits
//!
//! These traits are the seam between the drivers and the physical
//! transport. A port owns one attached device: addressing of the bus
//! itself (USB url, I2C device address, chip-select line) is fixed when
//! the port is constructed, so the drivers only ever speak in terms of
//! memory offsets and raw bytes.

use crate::error::Result;

/// Bus port for an I2C memory device
///
/// `offset` is the memory's internal word address. The port is
/// responsible for emitting it on the wire with the width the device
/// expects (one or two address bytes), and for blocking until the
/// device acknowledges a write.
pub trait I2cPort {
    /// Read `buf.len()` bytes starting at `offset` in one transaction
    fn read_from(&mut self, offset: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `offset` in one transaction
    ///
    /// The caller guarantees the write does not cross a device page
    /// boundary. Returns once the device has accepted the data.
    fn write_to(&mut self, offset: u32, data: &[u8]) -> Result<()>;
}

/// Bus port for an SPI device with explicit chip-select control
///
/// `start` asserts chip-select before the transfer and `stop` releases
/// it afterwards. A multi-call transaction keeps the device selected by
/// passing `stop = false` on the opening call and `start = false` on
/// every continuation; the final call passes `stop = true`.
pub trait SpiPort {
    /// Shift out `data`
    fn write(&mut self, data: &[u8], start: bool, stop: bool) -> Result<()>;

    /// One full chip-select-wrapped transaction: shift out `command`,
    /// then shift `read_buf.len()` bytes in
    fn exchange(&mut self, command: &[u8], read_buf: &mut [u8]) -> Result<()>;

    /// Shift `buf.len()` bytes in
    fn read(&mut self, buf: &mut [u8], start: bool, stop: bool) -> Result<()>;

    /// Pause between completion polls
    fn delay_us(&mut self, us: u32);
}

impl<T: I2cPort + ?Sized> I2cPort for Box<T> {
    fn read_from(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read_from(offset, buf)
    }

    fn write_to(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        (**self).write_to(offset, data)
    }
}

impl<T: SpiPort + ?Sized> SpiPort for Box<T> {
    fn write(&mut self, data: &[u8], start: bool, stop: bool) -> Result<()> {
        (**self).write(data, start, stop)
    }

    fn exchange(&mut self, command: &[u8], read_buf: &mut [u8]) -> Result<()> {
        (**self).exchange(command, read_buf)
    }

    fn read(&mut self, buf: &mut [u8], start: bool, stop: bool) -> Result<()> {
        (**self).read(buf, start, stop)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
