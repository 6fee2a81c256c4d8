//! FTDI MPSSE protocol constants
//!
//! Command opcodes and pin assignments for the MPSSE engine, per the
//! FTDI AN-108 application note.

// Allow unused constants - they're provided for completeness
#![allow(dead_code)]

// ============================================================================
// USB VID/PID constants
// ============================================================================

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;

/// FT2232H product ID (dual channel)
pub const FTDI_FT2232H_PID: u16 = 0x6010;

/// FT4232H product ID (quad channel)
pub const FTDI_FT4232H_PID: u16 = 0x6011;

/// FT232H product ID (single channel)
pub const FTDI_FT232H_PID: u16 = 0x6014;

/// FT4233H product ID (quad channel)
pub const FTDI_FT4233H_PID: u16 = 0x6041;

// ============================================================================
// MPSSE commands
// ============================================================================

/// Clock bytes out
pub const MPSSE_DO_WRITE: u8 = 0x10;

/// Clock bytes in
pub const MPSSE_DO_READ: u8 = 0x20;

/// Shift data out on the negative clock edge
pub const MPSSE_WRITE_NEG: u8 = 0x01;

/// Sample data in on the negative clock edge
pub const MPSSE_READ_NEG: u8 = 0x04;

/// Transfer bits instead of bytes
pub const MPSSE_BITMODE: u8 = 0x02;

/// Set data bits low byte (value, direction)
pub const SET_BITS_LOW: u8 = 0x80;

/// Disable loopback mode
pub const LOOPBACK_END: u8 = 0x85;

/// Set clock divisor
pub const TCK_DIVISOR: u8 = 0x86;

/// Send immediate (flush read buffer to host)
pub const SEND_IMMEDIATE: u8 = 0x87;

/// Disable divide-by-5 prescaler (60 MHz base clock on 'H' parts)
pub const DIS_DIV_5: u8 = 0x8A;

/// Enable 3-phase data clocking (required for I2C)
pub const EN_3_PHASE: u8 = 0x8C;

/// Largest single MPSSE data transfer (16-bit length field)
pub const MAX_TRANSFER: usize = 65536;

// ============================================================================
// Pin assignments (ADBUS low byte)
//
// TCK/SK is bit 0 (clock), TDI/DO is bit 1 (data out), TDO/DI is bit 2
// (data in), TMS/CS is bit 3, GPIOL0-3 are bits 4-7.
// ============================================================================

/// Bit position for SK (clock)
pub const PIN_SK: u8 = 0;

/// Bit position for DO (data out / MOSI)
pub const PIN_DO: u8 = 1;

/// Bit position for DI (data in / MISO)
pub const PIN_DI: u8 = 2;

/// Bit position for CS (chip select)
pub const PIN_CS: u8 = 3;

/// Bit position for GPIOL0
pub const PIN_GPIOL0: u8 = 4;

/// Supported FTDI device types
///
/// All of these are high-speed 'H' parts with a 60 MHz base clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtdiDeviceType {
    /// FT2232H (dual channel)
    #[default]
    Ft2232H,
    /// FT4232H (quad channel)
    Ft4232H,
    /// FT232H (single channel)
    Ft232H,
    /// FT4233H (quad channel)
    Ft4233H,
}

impl FtdiDeviceType {
    /// Get the vendor ID for this device type
    pub fn vendor_id(&self) -> u16 {
        FTDI_VID
    }

    /// Get the product ID for this device type
    pub fn product_id(&self) -> u16 {
        match self {
            FtdiDeviceType::Ft2232H => FTDI_FT2232H_PID,
            FtdiDeviceType::Ft4232H => FTDI_FT4232H_PID,
            FtdiDeviceType::Ft232H => FTDI_FT232H_PID,
            FtdiDeviceType::Ft4233H => FTDI_FT4233H_PID,
        }
    }

    /// Get the number of MPSSE-capable channels
    pub fn channel_count(&self) -> u8 {
        match self {
            FtdiDeviceType::Ft232H => 1,
            FtdiDeviceType::Ft2232H => 2,
            FtdiDeviceType::Ft4232H | FtdiDeviceType::Ft4233H => 4,
        }
    }

    /// Parse device type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "2232h" | "ft2232h" => Some(FtdiDeviceType::Ft2232H),
            "4232h" | "ft4232h" => Some(FtdiDeviceType::Ft4232H),
            "232h" | "ft232h" => Some(FtdiDeviceType::Ft232H),
            "4233h" | "ft4233h" => Some(FtdiDeviceType::Ft4233H),
            _ => None,
        }
    }

    /// Get the name of this device type
    pub fn name(&self) -> &'static str {
        match self {
            FtdiDeviceType::Ft2232H => "FT2232H",
            FtdiDeviceType::Ft4232H => "FT4232H",
            FtdiDeviceType::Ft232H => "FT232H",
            FtdiDeviceType::Ft4233H => "FT4233H",
        }
    }
}

/// FTDI interface/channel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtdiInterface {
    /// Channel A (default)
    #[default]
    A,
    /// Channel B
    B,
    /// Channel C
    C,
    /// Channel D
    D,
}

impl FtdiInterface {
    /// Parse interface from character
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(FtdiInterface::A),
            'B' => Some(FtdiInterface::B),
            'C' => Some(FtdiInterface::C),
            'D' => Some(FtdiInterface::D),
            _ => None,
        }
    }

    /// Get the interface index (0-3)
    pub fn index(&self) -> u8 {
        match self {
            FtdiInterface::A => 0,
            FtdiInterface::B => 1,
            FtdiInterface::C => 2,
            FtdiInterface::D => 3,
        }
    }

    /// Get the channel letter
    pub fn letter(&self) -> char {
        match self {
            FtdiInterface::A => 'A',
            FtdiInterface::B => 'B',
            FtdiInterface::C => 'C',
            FtdiInterface::D => 'D',
        }
    }
}

/// Board-level quirks layered on top of the plain FTDI pinout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hardware {
    /// Bare FTDI pins, no buffers
    #[default]
    Generic,
    /// Dangerous Prototypes Bus Blaster: the CPLD output buffers are
    /// enabled by driving GPIOL0 low
    BusBlaster,
}

impl Hardware {
    /// Parse hardware name from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generic" => Some(Hardware::Generic),
            "busblaster" => Some(Hardware::BusBlaster),
            _ => None,
        }
    }

    /// Extra pin-direction bits this board needs driven
    pub fn extra_pindir(&self) -> u8 {
        match self {
            Hardware::Generic => 0,
            Hardware::BusBlaster => 1 << PIN_GPIOL0,
        }
    }

    /// Extra output levels for the driven pins (Bus Blaster wants
    /// GPIOL0 low, so no bits set)
    pub fn extra_bits(&self) -> u8 {
        0
    }
}
