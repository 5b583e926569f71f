//! # Device Errors
//!
//! Failures reported by block devices. The engines surface them unchanged
//! as `KvError::DeviceIo`; retry policy, if any, belongs here and not in
//! the stores.

use shared_types::KvError;
use thiserror::Error;

/// Result alias for device operations.
pub type BdResult<T> = Result<T, BlockDeviceError>;

/// Errors that can occur during block device operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockDeviceError {
    /// Access beyond the end of the device.
    #[error("Out of bounds: {addr:#x}+{len} exceeds device size {size}")]
    OutOfBounds { addr: u64, len: u64, size: u64 },

    /// Address or length not a multiple of the required unit.
    #[error("Unaligned {op}: {addr:#x}+{len} not a multiple of {unit}")]
    Unaligned {
        op: &'static str,
        addr: u64,
        len: u64,
        unit: u64,
    },

    /// Program over a byte that was not erased.
    #[error("Program over non-erased byte at {addr:#x}")]
    NotErased { addr: u64 },

    /// Simulated power loss.
    #[error("Power lost during {op}")]
    PowerLoss { op: &'static str },

    /// Host I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BlockDeviceError {
    fn from(err: std::io::Error) -> Self {
        BlockDeviceError::Io(err.to_string())
    }
}

impl From<BlockDeviceError> for KvError {
    fn from(err: BlockDeviceError) -> Self {
        KvError::DeviceIo {
            message: err.to_string(),
        }
    }
}
