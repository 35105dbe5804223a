//! Character device registration
//!
//! Registering a character device takes two steps, as in Linux:
//! first claim a range of device numbers, then attach a driver to it.
//! Teardown runs the same steps in reverse.

use crate::{FileOperations, KernelError};
use core_types::DeviceNumber;

/// The device-number and character-device subsystems of a kernel
pub trait CharDeviceRegistry {
    /// Claims `count` consecutive device numbers starting at `first`
    /// (`register_chrdev_region`)
    ///
    /// # Errors
    /// Returns `KernelError::Busy` if any number in the range is already
    /// claimed, `KernelError::InvalidArgument` if `count` is zero or the
    /// range leaves the major.
    fn register_chrdev_region(
        &mut self,
        first: DeviceNumber,
        count: u32,
        name: &str,
    ) -> Result<(), KernelError>;

    /// Releases a range previously claimed with `register_chrdev_region`
    /// (`unregister_chrdev_region`)
    ///
    /// Releasing numbers that are not claimed is a no-op.
    fn unregister_chrdev_region(&mut self, first: DeviceNumber, count: u32);

    /// Makes `ops` live for `count` device numbers starting at `first`
    /// (`cdev_add`)
    ///
    /// From this point on, opens of a node carrying one of these numbers are
    /// dispatched into `ops`. The kernel owns the driver until `cdev_del`.
    ///
    /// # Errors
    /// Returns `KernelError::Busy` if a driver is already attached to any of
    /// the numbers.
    fn cdev_add(
        &mut self,
        first: DeviceNumber,
        count: u32,
        ops: Box<dyn FileOperations>,
    ) -> Result<(), KernelError>;

    /// Detaches the driver registered at `first` and hands it back (`cdev_del`)
    ///
    /// Files still open on the device are released first.
    fn cdev_del(&mut self, first: DeviceNumber) -> Option<Box<dyn FileOperations>>;
}
