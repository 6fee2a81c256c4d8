//! Standard JEDEC SPI NOR flash opcodes
//!
//! Only the commands the driver actually issues are defined here; the
//! chips in the registry all accept this common subset.

/// Write Enable - required before any program/erase operation
pub const WREN: u8 = 0x06;

/// Read Status Register 1
pub const RDSR: u8 = 0x05;

/// Read JEDEC ID (manufacturer + device ID, 3 bytes)
pub const RDID: u8 = 0x9F;

/// Read Data
pub const READ: u8 = 0x03;

/// Page Program
pub const PP: u8 = 0x02;

/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;

/// Enter 4-Byte Address Mode
pub const EN4B: u8 = 0xB7;

/// Reset Enable
pub const RSTEN: u8 = 0x66;

/// Reset Device
pub const RST: u8 = 0x99;

/// Status Register 1: Write In Progress / Busy
pub const SR1_WIP: u8 = 0x01;
