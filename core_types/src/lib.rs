//! # Core Types
//!
//! This crate defines the value types shared by the kernel contract, the
//! simulated kernel and device modules.
//!
//! ## Key Types
//!
//! - [`DeviceNumber`]: A (major, minor) pair identifying a device
//! - [`ProcessId`]: Identifier for a user process issuing file operations
//! - [`FileId`]: Identifier for one open file (one open/close session)
//! - [`UserAddr`]: An address in a process's user address space
//! - [`MemoryPerms`]: Permission flags for user memory regions

pub mod device;
pub mod ids;
pub mod memory;

pub use device::{DeviceNumber, DeviceNumberError, MINOR_BITS, MAJOR_MAX, MINOR_MAX};
pub use ids::{FileId, ProcessId};
pub use memory::{MemoryPerms, MemoryRegionId, UserAddr};
