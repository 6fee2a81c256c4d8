//! memprog-ftdi - FTDI MPSSE bus ports
//!
//! Implements the memprog-core port traits on top of FTDI's MPSSE
//! engine through libftdi1 (FT2232H, FT4232H, FT232H, FT4233H).
//!
//! The SPI port drives chip select as a GPIO, so a flash transaction
//! can span multiple transfer calls with the device held selected. The
//! I2C port bit-bangs open-drain I2C with 3-phase clocking; it needs
//! DO and DI wired together with a pull-up on the SDA line.
//!
//! # Example
//!
//! ```no_run
//! use memprog_ftdi::{FtdiSpi, SpiConfig};
//! use memprog_core::SpiFlash;
//!
//! let config = SpiConfig::default().frequency(10_000_000)?;
//! let port = FtdiSpi::open(&config)?;
//! let flash = SpiFlash::new(port)?;
//! println!("Detected {}", flash.model().name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Port options
//!
//! The `-p/--port` string accepts the following `key=value` pairs after
//! the `ftdi:` prefix:
//!
//! - `type=<device>` - Device type (2232h, 4232h, 232h, 4233h)
//! - `channel=<A|B|C|D>` - MPSSE channel to use (default: A)
//! - `divisor=<N>` - Explicit clock divisor (2-65534, even)
//!
//! # Clock speed
//!
//! The SPI clock is derived from the 60 MHz base clock:
//!
//! ```text
//! SPI_clock = 60 MHz / divisor
//! ```
//!
//! I2C runs at 40 MHz / divisor because of the extra data-hold clock
//! phase.

mod device;
mod error;
mod i2c;
mod protocol;
mod spi;

pub use device::{parse_options, PortOptions};
pub use error::{FtdiError, Result};
pub use i2c::{FtdiI2c, I2cConfig};
pub use protocol::{FtdiDeviceType, FtdiInterface, Hardware};
pub use spi::{FtdiSpi, SpiConfig};
