//! memprog-core - device abstraction layer for serial memories
//!
//! This crate turns arbitrary-length, arbitrary-offset read/write/erase
//! requests into correctly bounded sequences of bus transactions that
//! respect each memory's physical constraints: page size for writes,
//! sector size for erases, and addressing-mode width for large flash.
//!
//! # Architecture
//!
//! Two independent drivers, each composed from a bus-port capability and
//! a model descriptor:
//!
//! - [`Eeprom`] - page-respecting write chunking and pass-through reads
//!   for I2C EEPROMs, driven through an [`I2cPort`].
//! - [`SpiFlash`] - reset, JEDEC identification, 3/4-byte addressing,
//!   chunked reads, page programming and sector erase for SPI NOR flash,
//!   driven through an [`SpiPort`].
//!
//! The ports abstract the physical transport (USB framing, clocking,
//! chip-select control); implementations live outside this crate. Data
//! is streamed between the device and caller-supplied `Read`/`Write`
//! endpoints.

pub mod address;
pub mod eeprom;
pub mod error;
pub mod flash;
pub mod models;
pub mod opcodes;
pub mod port;

mod stream;

pub use address::AddrWidth;
pub use eeprom::Eeprom;
pub use error::{Error, Result};
pub use flash::{SpiFlash, Timeouts};
pub use models::{EepromModel, FlashModel};
pub use port::{I2cPort, SpiPort};
