//! Kernel error types

use core_types::{DeviceNumber, FileId};
use thiserror::Error;

/// Errors that can occur when interacting with the kernel
///
/// Each variant corresponds to one Linux errno, see [`KernelError::errno`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KernelError {
    /// Copy across the user boundary touched an invalid address
    #[error("Bad address")]
    Fault,

    /// Resource already claimed by another registrant
    #[error("Device or resource busy: {0}")]
    Busy(String),

    /// Argument outside the accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No driver is registered for the device number
    #[error("No such device: {0}")]
    NoDevice(DeviceNumber),

    /// File id is not open, or not open for the requested access
    #[error("Bad file descriptor: {0}")]
    BadFile(FileId),

    /// The driver does not implement the operation
    #[error("Operation not supported")]
    NotSupported,

    /// Allocation failed
    #[error("Out of memory")]
    OutOfMemory,

    /// Named entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Named entity already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl KernelError {
    /// Returns the negative errno a kernel entry point would return
    pub fn errno(&self) -> i32 {
        match self {
            KernelError::NotFound(_) => -2,
            KernelError::NoDevice(_) => -6,
            KernelError::BadFile(_) => -9,
            KernelError::OutOfMemory => -12,
            KernelError::Fault => -14,
            KernelError::Busy(_) => -16,
            KernelError::AlreadyExists(_) => -17,
            KernelError::InvalidArgument(_) => -22,
            KernelError::NotSupported => -95,
        }
    }
}
