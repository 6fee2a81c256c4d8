//! SPI NOR flash driver
//!
//! Construction runs the identification sequence against the live
//! device: software reset, JEDEC ID read, registry lookup, then entry
//! into 4-byte addressing for chips above 16 MiB. All subsequent
//! operations use the addressing width fixed here.
//!
//! Program and erase completion is detected by polling the status
//! register's write-in-progress bit, with a bounded retry budget per
//! operation class.

use std::io::{Read, Write};

use crate::address::AddrWidth;
use crate::error::{Error, Result};
use crate::models::FlashModel;
use crate::opcodes;
use crate::port::SpiPort;
use crate::stream;

/// Page-program granularity shared by all supported NOR chips
pub const PAGE_SIZE: u32 = 256;

/// Per-call read buffer bound
///
/// Reads stay a single chip-select-held bus transaction regardless of
/// total length; this only caps how much is buffered between the port
/// and the sink per call.
const READ_CHUNK: usize = 4096;

/// Completion-poll budgets for program and erase
///
/// Poll intervals and timeouts follow typical datasheet figures: a page
/// program completes in 0.7-5 ms, a 64 KiB block erase in 0.15-2 s.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Delay between status polls while a page program runs
    pub program_poll_us: u32,
    /// Retry budget for one page program
    pub program_timeout_us: u32,
    /// Delay between status polls while a sector erase runs
    pub erase_poll_us: u32,
    /// Retry budget for one sector erase
    pub erase_timeout_us: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            program_poll_us: 100,
            program_timeout_us: 50_000,
            erase_poll_us: 10_000,
            erase_timeout_us: 4_000_000,
        }
    }
}

/// Handle to one identified flash chip behind an exclusively owned port
pub struct SpiFlash<P: SpiPort> {
    port: P,
    model: &'static FlashModel,
    addr_width: AddrWidth,
    timeouts: Timeouts,
}

impl<P: SpiPort> SpiFlash<P> {
    /// Reset and identify the attached chip
    ///
    /// Fails with [`Error::UnsupportedJedecId`] when the device reports
    /// an ID that is not in the registry. The device's reported ID, not
    /// a user argument, selects the model.
    pub fn new(mut port: P) -> Result<Self> {
        // Software reset, fire and forget. The short settle delays come
        // from the reset timing common to the supported chips.
        port.write(&[opcodes::RSTEN], true, true)?;
        port.delay_us(50);
        port.write(&[opcodes::RST], true, true)?;
        port.delay_us(100);

        let mut id = [0u8; 3];
        port.exchange(&[opcodes::RDID], &mut id)?;
        let jedec_id = u32::from(id[0]) << 16 | u32::from(id[1]) << 8 | u32::from(id[2]);

        let model = FlashModel::lookup(jedec_id).ok_or(Error::UnsupportedJedecId(jedec_id))?;

        let addr_width = AddrWidth::for_size(model.size);
        if addr_width == AddrWidth::FourByte {
            log::debug!("{}: entering 4-byte addressing mode", model.name);
            port.write(&[opcodes::EN4B], true, true)?;
        }

        log::info!(
            "found {} (JEDEC {:06x}, {} bytes, {} byte sectors)",
            model.name,
            jedec_id,
            model.size,
            model.sector
        );

        Ok(Self {
            port,
            model,
            addr_width,
            timeouts: Timeouts::default(),
        })
    }

    /// Replace the completion-poll budgets
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// The resolved model descriptor
    pub fn model(&self) -> &'static FlashModel {
        self.model
    }

    /// Address width selected at construction
    pub fn addr_width(&self) -> AddrWidth {
        self.addr_width
    }

    /// Consume the handle, releasing the bus port
    pub fn into_port(self) -> P {
        self.port
    }

    fn check_bounds(&self, offset: u32, count: u64) -> Result<()> {
        if offset as u64 + count > self.model.size as u64 {
            return Err(Error::OutOfBounds {
                offset,
                count: count as u32,
                size: self.model.size,
            });
        }
        Ok(())
    }

    /// Build `opcode` + encoded address into `buf`, returning the used prefix
    fn command<'a>(&self, opcode: u8, offset: u32, buf: &'a mut [u8; 5]) -> &'a [u8] {
        buf[0] = opcode;
        self.addr_width.encode(offset, &mut buf[1..]);
        &buf[..1 + self.addr_width.bytes()]
    }

    /// Read the status register
    pub fn status(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.port.exchange(&[opcodes::RDSR], &mut buf)?;
        Ok(buf[0])
    }

    /// Whether a program/erase is still completing internally
    pub fn wip(&mut self) -> Result<bool> {
        Ok(self.status()? & opcodes::SR1_WIP != 0)
    }

    /// Poll the write-in-progress bit until it clears
    ///
    /// Fails with [`Error::Timeout`] once the retry budget is spent, so
    /// a wedged device cannot hang the caller indefinitely.
    fn wait_ready(&mut self, poll_us: u32, timeout_us: u32) -> Result<()> {
        let max_polls = if poll_us > 0 { timeout_us / poll_us } else { timeout_us };

        for _ in 0..=max_polls {
            if !self.wip()? {
                return Ok(());
            }
            if poll_us > 0 {
                self.port.delay_us(poll_us);
            }
        }

        Err(Error::Timeout(timeout_us / 1000))
    }

    /// Read `count` bytes starting at `offset` into `sink`
    ///
    /// One continuous bus transaction: the read command is issued with
    /// chip-select held, and data is streamed out in bounded chunks until
    /// the final one releases the line.
    pub fn read<W: Write + ?Sized>(&mut self, sink: &mut W, offset: u32, count: u64) -> Result<()> {
        self.check_bounds(offset, count)?;
        if count == 0 {
            return Ok(());
        }

        let mut cmd = [0u8; 5];
        self.port.write(self.command(opcodes::READ, offset, &mut cmd), true, false)?;

        let mut buf = vec![0u8; READ_CHUNK];
        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(READ_CHUNK as u64) as usize;
            let last = remaining == chunk as u64;
            self.port.read(&mut buf[..chunk], false, last)?;
            sink.write_all(&buf[..chunk])?;
            remaining -= chunk as u64;
        }

        Ok(())
    }

    /// Program up to one page at `offset` with `count` bytes from `source`
    ///
    /// The caller guarantees `[offset, offset + count)` does not cross a
    /// page boundary. A source that yields no bytes at all makes this a
    /// no-op; one that ends mid-chunk is an underrun. Returns the number
    /// of bytes programmed (`0` or `count`).
    pub fn program_page<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        offset: u32,
        count: usize,
    ) -> Result<usize> {
        debug_assert!(count as u32 <= PAGE_SIZE - offset % PAGE_SIZE);

        let mut buf = vec![0u8; count];
        let got = stream::read_filled(source, &mut buf)?;
        if got == 0 {
            return Ok(0);
        }
        if got < count {
            return Err(Error::Underrun {
                expected: count,
                got,
            });
        }

        self.port.write(&[opcodes::WREN], true, true)?;

        let mut cmd = [0u8; 5];
        self.port.write(self.command(opcodes::PP, offset, &mut cmd), true, false)?;
        self.port.write(&buf, false, true)?;

        self.wait_ready(self.timeouts.program_poll_us, self.timeouts.program_timeout_us)?;
        Ok(count)
    }

    /// Write `count` bytes from `source` starting at `offset`
    ///
    /// Decomposes the request into page-program cycles: a partial head
    /// page up to the next 256-byte boundary, full pages, then a
    /// partial-or-full tail. A source that ends before `count` bytes
    /// fails with [`Error::Underrun`], even when it ends exactly on a
    /// page boundary; the pages read so far stay programmed.
    pub fn program<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        offset: u32,
        count: u64,
    ) -> Result<()> {
        self.check_bounds(offset, count)?;

        let mut offset = offset;
        let mut remaining = count;

        while remaining > 0 {
            let room = (PAGE_SIZE - offset % PAGE_SIZE) as u64;
            let chunk = remaining.min(room) as usize;

            log::trace!("page program: {} bytes at {:#x}", chunk, offset);
            if self.program_page(source, offset, chunk)? == 0 {
                return Err(Error::Underrun {
                    expected: count as usize,
                    got: (count - remaining) as usize,
                });
            }

            offset += chunk as u32;
            remaining -= chunk as u64;
        }

        Ok(())
    }

    /// Erase one sector
    fn erase_sector(&mut self, offset: u32) -> Result<()> {
        log::debug!("erase sector at {:#x}", offset);
        self.port.write(&[opcodes::WREN], true, true)?;

        let mut cmd = [0u8; 5];
        self.port.write(self.command(opcodes::BE_D8, offset, &mut cmd), true, true)?;

        self.wait_ready(self.timeouts.erase_poll_us, self.timeouts.erase_timeout_us)
    }

    /// Erase `count` bytes starting at `offset`
    ///
    /// Both values must be exact multiples of the model's sector size;
    /// the driver never rounds for the caller. Issues one erase cycle
    /// per sector.
    pub fn erase(&mut self, offset: u32, count: u64) -> Result<()> {
        let sector = self.model.sector;
        if offset % sector != 0 {
            return Err(Error::Misaligned {
                name: "offset",
                value: offset,
                sector,
            });
        }
        if count % sector as u64 != 0 {
            return Err(Error::Misaligned {
                name: "count",
                value: count as u32,
                sector,
            });
        }
        self.check_bounds(offset, count)?;

        let mut offset = offset;
        let mut remaining = count;
        while remaining > 0 {
            self.erase_sector(offset)?;
            offset += sector;
            remaining -= sector as u64;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One chip-select-framed exchange seen by the mock port
    #[derive(Debug, PartialEq, Eq)]
    enum Frame {
        /// Bytes shifted out between CS assert and release
        Write(Vec<u8>),
        /// Command bytes, then the total number of bytes shifted in
        Read(Vec<u8>, usize),
    }

    /// Mock port that reassembles CS-framed transactions
    struct FramePort {
        jedec_id: u32,
        frames: Vec<Frame>,
        open: Vec<u8>,
        open_read: usize,
        /// Number of RDSR polls that still report busy
        busy_polls: u32,
    }

    impl FramePort {
        fn new(jedec_id: u32) -> Self {
            Self {
                jedec_id,
                frames: Vec::new(),
                open: Vec::new(),
                open_read: 0,
                busy_polls: 0,
            }
        }
    }

    impl SpiPort for FramePort {
        fn write(&mut self, data: &[u8], start: bool, stop: bool) -> Result<()> {
            if start {
                assert!(self.open.is_empty(), "CS already asserted");
            } else {
                assert!(!self.open.is_empty(), "continuation without CS");
            }
            self.open.extend_from_slice(data);
            if stop {
                self.frames.push(Frame::Write(std::mem::take(&mut self.open)));
            }
            Ok(())
        }

        fn exchange(&mut self, command: &[u8], read_buf: &mut [u8]) -> Result<()> {
            match command[0] {
                opcodes::RDID => {
                    read_buf[0] = (self.jedec_id >> 16) as u8;
                    read_buf[1] = (self.jedec_id >> 8) as u8;
                    read_buf[2] = self.jedec_id as u8;
                }
                opcodes::RDSR => {
                    read_buf[0] = if self.busy_polls > 0 {
                        self.busy_polls -= 1;
                        opcodes::SR1_WIP
                    } else {
                        0
                    };
                }
                other => panic!("unexpected exchange opcode {other:#04x}"),
            }
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8], start: bool, stop: bool) -> Result<()> {
            assert!(!start, "driver reads are continuations");
            assert!(!self.open.is_empty(), "read outside a transaction");
            buf.fill(0xEE);
            self.open_read += buf.len();
            if stop {
                self.frames.push(Frame::Read(
                    std::mem::take(&mut self.open),
                    std::mem::take(&mut self.open_read),
                ));
            }
            Ok(())
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    fn small_flash() -> SpiFlash<FramePort> {
        // w25q128fv: 16 MiB, 3-byte addressing
        SpiFlash::new(FramePort::new(0xef4018)).unwrap()
    }

    fn large_flash() -> SpiFlash<FramePort> {
        // mx66l1g45g: 128 MiB, 4-byte addressing
        SpiFlash::new(FramePort::new(0xc2201b)).unwrap()
    }

    /// Drop the reset frames emitted during construction
    fn op_frames(port: &FramePort) -> &[Frame] {
        assert_eq!(port.frames[0], Frame::Write(vec![opcodes::RSTEN]));
        assert_eq!(port.frames[1], Frame::Write(vec![opcodes::RST]));
        &port.frames[2..]
    }

    #[test]
    fn unknown_jedec_id_is_rejected() {
        match SpiFlash::new(FramePort::new(0x123456)) {
            Err(Error::UnsupportedJedecId(0x123456)) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn large_chip_enters_4byte_mode() {
        let dev = large_flash();
        assert_eq!(dev.addr_width(), AddrWidth::FourByte);
        let port = dev.into_port();
        assert_eq!(op_frames(&port), &[Frame::Write(vec![opcodes::EN4B])]);
    }

    #[test]
    fn small_chip_stays_in_3byte_mode() {
        let dev = small_flash();
        assert_eq!(dev.addr_width(), AddrWidth::ThreeByte);
        let port = dev.into_port();
        assert!(op_frames(&port).is_empty());
    }

    #[test]
    fn read_is_one_transaction_with_bounded_chunks() {
        let mut dev = small_flash();
        let mut sink = Vec::new();
        dev.read(&mut sink, 0x1234, 10_000).unwrap();
        assert_eq!(sink.len(), 10_000);

        let port = dev.into_port();
        // Header + all chunk reads form a single CS frame.
        assert_eq!(
            op_frames(&port),
            &[Frame::Read(vec![opcodes::READ, 0x00, 0x12, 0x34], 10_000)]
        );
    }

    #[test]
    fn read_uses_4byte_addresses_on_large_chips() {
        let mut dev = large_flash();
        let mut sink = Vec::new();
        dev.read(&mut sink, 0x0112_3456, 4).unwrap();

        let port = dev.into_port();
        assert_eq!(
            op_frames(&port)[1..],
            [Frame::Read(vec![opcodes::READ, 0x01, 0x12, 0x34, 0x56], 4)]
        );
    }

    #[test]
    fn zero_length_read_touches_nothing() {
        let mut dev = small_flash();
        let mut sink = Vec::new();
        dev.read(&mut sink, 0, 0).unwrap();
        assert!(op_frames(&dev.into_port()).is_empty());
    }

    /// Extract (offset, payload_len) for every page-program frame
    fn program_cycles(frames: &[Frame]) -> Vec<(u32, usize)> {
        let mut cycles = Vec::new();
        let mut iter = frames.iter();
        while let Some(frame) = iter.next() {
            assert_eq!(*frame, Frame::Write(vec![opcodes::WREN]));
            let Some(Frame::Write(bytes)) = iter.next() else {
                panic!("WREN not followed by a program frame");
            };
            assert_eq!(bytes[0], opcodes::PP);
            let addr = u32::from(bytes[1]) << 16 | u32::from(bytes[2]) << 8 | u32::from(bytes[3]);
            cycles.push((addr, bytes.len() - 4));
        }
        cycles
    }

    #[test]
    fn program_decomposes_at_page_boundaries() {
        let mut dev = small_flash();
        let data = vec![0x5Au8; 600];
        dev.program(&mut data.as_slice(), 0x1F0, 600).unwrap();

        let cycles = program_cycles(op_frames(&dev.into_port()));
        assert_eq!(cycles, vec![(0x1F0, 16), (0x200, 256), (0x300, 256), (0x400, 72)]);
    }

    #[test]
    fn program_cycles_never_cross_pages() {
        for &(offset, count) in &[(0u32, 1u64), (1, 255), (255, 2), (256, 256), (300, 1000)] {
            let mut dev = small_flash();
            let data = vec![0u8; count as usize];
            dev.program(&mut data.as_slice(), offset, count).unwrap();

            let cycles = program_cycles(op_frames(&dev.into_port()));
            let mut next = offset;
            for &(at, len) in &cycles {
                assert_eq!(at, next);
                assert!(len <= 256);
                assert_eq!(at / 256, (at + len as u32 - 1) / 256, "page crossing");
                next = at + len as u32;
            }
            assert_eq!(next as u64, offset as u64 + count);
        }
    }

    #[test]
    fn program_with_short_source_is_an_underrun() {
        let mut dev = small_flash();
        let data = vec![0u8; 100];
        let err = dev.program(&mut data.as_slice(), 0, 300).unwrap_err();
        assert!(matches!(err, Error::Underrun { .. }));
    }

    #[test]
    fn program_page_with_empty_source_is_a_noop() {
        let mut dev = small_flash();
        let mut empty: &[u8] = &[];
        assert_eq!(dev.program_page(&mut empty, 0, 64).unwrap(), 0);
        assert!(op_frames(&dev.into_port()).is_empty());
    }

    #[test]
    fn program_detects_eof_at_a_page_boundary() {
        // One full page of input against a two-page request. The first
        // page programs; the exhausted source must not let the request
        // report success.
        let mut dev = small_flash();
        let data = vec![0xA5u8; 256];
        let err = dev.program(&mut data.as_slice(), 0, 512).unwrap_err();
        match err {
            Error::Underrun { expected, got } => {
                assert_eq!(expected, 512);
                assert_eq!(got, 256);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // The page that did arrive was still programmed.
        let frames = dev.into_port();
        let pp = op_frames(&frames)
            .iter()
            .filter(|f| matches!(f, Frame::Write(bytes) if bytes[0] == opcodes::PP))
            .count();
        assert_eq!(pp, 1);
    }

    #[test]
    fn erase_issues_one_cycle_per_sector() {
        let mut dev = small_flash();
        dev.erase(0x10000, 0x20000).unwrap();

        let frames = dev.into_port();
        let frames = op_frames(&frames);
        assert_eq!(
            frames,
            &[
                Frame::Write(vec![opcodes::WREN]),
                Frame::Write(vec![opcodes::BE_D8, 0x01, 0x00, 0x00]),
                Frame::Write(vec![opcodes::WREN]),
                Frame::Write(vec![opcodes::BE_D8, 0x02, 0x00, 0x00]),
            ]
        );
    }

    #[test]
    fn erase_rejects_unaligned_offset() {
        let mut dev = small_flash();
        let err = dev.erase(0x8000, 0x10000).unwrap_err();
        assert!(matches!(err, Error::Misaligned { name: "offset", .. }));
    }

    #[test]
    fn erase_rejects_unaligned_count() {
        let mut dev = small_flash();
        let err = dev.erase(0x10000, 0x8000).unwrap_err();
        assert!(matches!(err, Error::Misaligned { name: "count", .. }));
    }

    #[test]
    fn completion_wait_tolerates_busy_polls() {
        let mut dev = small_flash();
        dev.port.busy_polls = 3;
        dev.erase(0, 0x10000).unwrap();
    }

    #[test]
    fn wedged_device_times_out() {
        let mut dev = small_flash().with_timeouts(Timeouts {
            program_poll_us: 1,
            program_timeout_us: 10,
            erase_poll_us: 1,
            erase_timeout_us: 10,
        });
        dev.port.busy_polls = u32::MAX;
        let err = dev.erase(0, 0x10000).unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[test]
    fn operations_are_bounds_checked() {
        let mut dev = small_flash();
        let size = dev.model().size;

        let mut sink = Vec::new();
        assert!(matches!(
            dev.read(&mut sink, size - 4, 8),
            Err(Error::OutOfBounds { .. })
        ));

        let data = [0u8; 8];
        assert!(matches!(
            dev.program(&mut data.as_slice(), size - 4, 8),
            Err(Error::OutOfBounds { .. })
        ));

        assert!(matches!(
            dev.erase(size, 0x10000),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
