//! Error types for the FTDI bus ports

use thiserror::Error;

/// Result type for FTDI operations
pub type Result<T> = std::result::Result<T, FtdiError>;

/// Errors that can occur while opening or driving an FTDI adapter
#[derive(Debug, Error)]
pub enum FtdiError {
    /// Failed to open the USB device
    #[error("failed to open device: {0}")]
    OpenFailed(String),

    /// Failed to configure the device after opening
    #[error("failed to configure device: {0}")]
    ConfigFailed(String),

    /// USB transfer failed mid-operation
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// Unknown device type in the port options
    #[error("invalid device type: {0}")]
    InvalidDeviceType(String),

    /// Channel not available on the selected device
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    /// Bad port option value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// I2C slave did not acknowledge
    #[error("I2C NACK: {0}")]
    Nack(&'static str),

    /// Error reported by libftdi
    #[error("libftdi error: {0}")]
    LibFtdi(String),
}

impl From<ftdi::Error> for FtdiError {
    fn from(e: ftdi::Error) -> Self {
        FtdiError::LibFtdi(e.to_string())
    }
}

impl From<FtdiError> for memprog_core::Error {
    fn from(e: FtdiError) -> Self {
        memprog_core::Error::Transport(e.to_string())
    }
}
