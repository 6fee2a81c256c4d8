//! Flash address encoding

/// Byte count of the address field in flash commands
///
/// Fixed once at device construction from the model size and immutable
/// for the handle's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddrWidth {
    /// 3-byte (24-bit) address - supports up to 16 MiB
    ThreeByte,
    /// 4-byte (32-bit) address - supports up to 4 GiB
    FourByte,
}

/// Devices larger than this require 4-byte addressing
pub const THREE_BYTE_LIMIT: u32 = 16 * 1024 * 1024;

impl AddrWidth {
    /// Select the width for a device of `size` bytes
    pub const fn for_size(size: u32) -> Self {
        if size > THREE_BYTE_LIMIT {
            Self::FourByte
        } else {
            Self::ThreeByte
        }
    }

    /// Returns the number of address bytes
    pub const fn bytes(self) -> usize {
        match self {
            Self::ThreeByte => 3,
            Self::FourByte => 4,
        }
    }

    /// Encode `offset` into `buf`, most-significant byte first
    ///
    /// `buf` must be at least [`bytes`](Self::bytes) long; only that
    /// prefix is written.
    pub fn encode(self, offset: u32, buf: &mut [u8]) {
        match self {
            Self::ThreeByte => {
                buf[0] = (offset >> 16) as u8;
                buf[1] = (offset >> 8) as u8;
                buf[2] = offset as u8;
            }
            Self::FourByte => {
                buf[0] = (offset >> 24) as u8;
                buf[1] = (offset >> 16) as u8;
                buf[2] = (offset >> 8) as u8;
                buf[3] = offset as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_from_size() {
        assert_eq!(AddrWidth::for_size(16 * 1024 * 1024), AddrWidth::ThreeByte);
        assert_eq!(AddrWidth::for_size(16 * 1024 * 1024 + 1), AddrWidth::FourByte);
        assert_eq!(AddrWidth::for_size(128 * 1024 * 1024), AddrWidth::FourByte);
    }

    #[test]
    fn encode_three_byte_msb_first() {
        let mut buf = [0u8; 4];
        AddrWidth::ThreeByte.encode(0x123456, &mut buf);
        assert_eq!(&buf[..3], &[0x12, 0x34, 0x56]);
    }

    #[test]
    fn encode_four_byte_msb_first() {
        let mut buf = [0u8; 4];
        AddrWidth::FourByte.encode(0x0789ABCD, &mut buf);
        assert_eq!(buf, [0x07, 0x89, 0xAB, 0xCD]);
    }
}
