//! Model registries for supported memory devices
//!
//! Both registries are fixed at build time; an absent key is a
//! user-facing, non-retryable error surfaced by the drivers. EEPROMs are
//! selected by name on the command line, flash chips by the JEDEC ID the
//! live device reports.

const fn kib(n: u32) -> u32 {
    n << 10
}

const fn mib(n: u32) -> u32 {
    n << 20
}

/// Physical geometry of an I2C EEPROM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromModel {
    /// Model name as used on the command line
    pub name: &'static str,
    /// Total size in bytes
    pub size: u32,
    /// Write page size in bytes
    pub page: u32,
    /// Word-address bytes the device expects on the wire (1 or 2)
    pub addr_bytes: u8,
}

/// Supported EEPROM models
///
/// Only parts with a flat address space are listed; devices that fold
/// high address bits into the I2C device address (24c04/08/16) are not
/// supported.
pub const EEPROM_MODELS: &[EepromModel] = &[
    EepromModel { name: "24c02", size: 256, page: 16, addr_bytes: 1 },
    EepromModel { name: "24c32", size: kib(4), page: 32, addr_bytes: 2 },
    EepromModel { name: "24c64", size: kib(8), page: 32, addr_bytes: 2 },
    EepromModel { name: "24c128", size: kib(16), page: 64, addr_bytes: 2 },
    EepromModel { name: "24c256", size: kib(32), page: 64, addr_bytes: 2 },
    EepromModel { name: "24c512", size: kib(64), page: 128, addr_bytes: 2 },
];

impl EepromModel {
    /// Look up a model by name
    pub fn lookup(name: &str) -> Option<&'static EepromModel> {
        EEPROM_MODELS.iter().find(|m| m.name == name)
    }

    /// Names of all registered models, for CLI help text
    pub fn names() -> impl Iterator<Item = &'static str> {
        EEPROM_MODELS.iter().map(|m| m.name)
    }
}

/// Physical geometry of an SPI NOR flash chip
///
/// `size` and `sector` are powers of two and `sector` divides `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashModel {
    /// Part name, for log output
    pub name: &'static str,
    /// 24-bit JEDEC identifier (manufacturer byte first)
    pub jedec_id: u32,
    /// Total size in bytes
    pub size: u32,
    /// Erase sector size in bytes
    pub sector: u32,
}

/// Supported flash chips, all with uniform 64 KiB erase sectors
pub const FLASH_MODELS: &[FlashModel] = &[
    FlashModel { name: "mx25l6405d", jedec_id: 0xc22017, size: mib(8), sector: kib(64) },
    FlashModel { name: "mx25l12805d", jedec_id: 0xc22018, size: mib(16), sector: kib(64) },
    FlashModel { name: "mx66l1g45g", jedec_id: 0xc2201b, size: mib(128), sector: kib(64) },
    FlashModel { name: "w25q64fv", jedec_id: 0xef4017, size: mib(8), sector: kib(64) },
    FlashModel { name: "w25q128fv", jedec_id: 0xef4018, size: mib(16), sector: kib(64) },
    FlashModel { name: "w25q256fv", jedec_id: 0xef4019, size: mib(32), sector: kib(64) },
    FlashModel { name: "gd25q127c", jedec_id: 0xc84018, size: mib(16), sector: kib(64) },
];

impl FlashModel {
    /// Look up a chip by the JEDEC ID it reported
    pub fn lookup(jedec_id: u32) -> Option<&'static FlashModel> {
        FLASH_MODELS.iter().find(|m| m.jedec_id == jedec_id)
    }

    /// Number of erase sectors
    pub const fn sectors(&self) -> u32 {
        self.size / self.sector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eeprom_lookup() {
        let m = EepromModel::lookup("24c02").unwrap();
        assert_eq!(m.size, 256);
        assert_eq!(m.page, 16);
        assert_eq!(m.addr_bytes, 1);
        assert!(EepromModel::lookup("25lc256").is_none());
    }

    #[test]
    fn flash_lookup_by_jedec_id() {
        let m = FlashModel::lookup(0xc2201b).unwrap();
        assert_eq!(m.name, "mx66l1g45g");
        assert_eq!(m.size, 128 * 1024 * 1024);
        assert_eq!(m.sector, 64 * 1024);
        assert!(FlashModel::lookup(0xffffff).is_none());
    }

    #[test]
    fn flash_geometry_invariants() {
        for m in FLASH_MODELS {
            assert!(m.size.is_power_of_two(), "{}: size", m.name);
            assert!(m.sector.is_power_of_two(), "{}: sector", m.name);
            assert_eq!(m.size % m.sector, 0, "{}: sector divides size", m.name);
        }
    }

    #[test]
    fn eeprom_geometry_invariants() {
        for m in EEPROM_MODELS {
            assert_eq!(m.size % m.page, 0, "{}: page divides size", m.name);
            let addr_limit = 1u64 << (8 * m.addr_bytes as u64);
            assert!(m.size as u64 <= addr_limit, "{}: addressable", m.name);
        }
    }
}
