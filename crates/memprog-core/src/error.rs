//! Error types for memprog-core

use thiserror::Error;

/// Result type alias using the core [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the device drivers
///
/// All of these are fatal to the current command; there is no
/// partial-failure recovery. A failed page write mid-sequence aborts the
/// whole operation with whatever prefix already landed on the device.
#[derive(Debug, Error)]
pub enum Error {
    /// EEPROM model name not present in the registry
    #[error("unsupported EEPROM model \"{0}\"")]
    UnsupportedModel(String),

    /// JEDEC ID read from the device not present in the registry
    #[error("JEDEC ID {0:06x} is not supported")]
    UnsupportedJedecId(u32),

    /// Erase offset or count is not a multiple of the sector size
    #[error("{name} {value:#x} is not a multiple of the sector size ({sector:#x})")]
    Misaligned {
        /// Which argument failed validation ("offset" or "count")
        name: &'static str,
        /// The offending value
        value: u32,
        /// The model's sector size
        sector: u32,
    },

    /// Requested range does not fit within the device
    #[error("range {offset:#x}+{count:#x} exceeds the {size:#x} byte device")]
    OutOfBounds {
        /// Start of the requested range
        offset: u32,
        /// Length of the requested range
        count: u32,
        /// Total device size
        size: u32,
    },

    /// Source stream was exhausted before the requested bytes were supplied
    #[error("input ended after {got} of {expected} bytes")]
    Underrun {
        /// Bytes the current chunk asked for
        expected: usize,
        /// Bytes actually read
        got: usize,
    },

    /// Device-reported completion did not arrive within the retry budget
    #[error("device did not report completion within {0} ms")]
    Timeout(u32),

    /// Bus-level failure, propagated from the port implementation
    #[error("bus transport error: {0}")]
    Transport(String),

    /// Failure on the caller-supplied source or sink stream
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
