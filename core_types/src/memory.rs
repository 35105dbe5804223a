//! # Memory Types
//!
//! User memory as seen from the kernel side of the boundary.
//!
//! ## Key Types
//!
//! - [`UserAddr`]: A virtual address inside a process's user address space
//! - [`MemoryRegionId`]: Unique identifier for a mapped user region
//! - [`MemoryPerms`]: Permission flags for user regions (Read, Write, Execute)
//!
//! Addresses carry no authority on their own. Every copy across the
//! boundary is checked by the kernel against the mapped regions of the
//! calling process.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A user-space virtual address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserAddr(u64);

impl UserAddr {
    /// The null address, never mapped
    pub const NULL: UserAddr = UserAddr(0);

    /// Creates an address from its raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Returns the address `offset` bytes further on, or `None` on overflow
    pub fn checked_add(&self, offset: u64) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }

    /// Returns true for the null address
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Unique identifier for a mapped region of user memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRegionId(Uuid);

impl MemoryRegionId {
    /// Creates a new unique memory region ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID value
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MemoryRegionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryRegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region:{}", self.0)
    }
}

/// Memory permission flags
///
/// By default, no permissions are granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MemoryPerms {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl MemoryPerms {
    /// No permissions
    pub fn none() -> Self {
        Self::default()
    }

    /// Read-only permission
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Read and write permissions
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            execute: false,
        }
    }

    /// Check if this has read permission
    pub fn can_read(&self) -> bool {
        self.read
    }

    /// Check if this has write permission
    pub fn can_write(&self) -> bool {
        self.write
    }
}

impl fmt::Display for MemoryPerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { "R" } else { "-" },
            if self.write { "W" } else { "-" },
            if self.execute { "X" } else { "-" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_addr_arithmetic() {
        let addr = UserAddr::new(0x1000);
        assert_eq!(addr.checked_add(0x10), Some(UserAddr::new(0x1010)));
        assert_eq!(UserAddr::new(u64::MAX).checked_add(1), None);
        assert!(UserAddr::NULL.is_null());
        assert_eq!(addr.to_string(), "0x1000");
    }

    #[test]
    fn test_memory_perms() {
        assert!(!MemoryPerms::none().can_read());
        assert!(MemoryPerms::read_only().can_read());
        assert!(!MemoryPerms::read_only().can_write());
        assert!(MemoryPerms::read_write().can_write());
        assert!(!MemoryPerms::read_write().execute);
        assert_eq!(MemoryPerms::read_write().to_string(), "RW-");
    }

    #[test]
    fn test_region_ids_unique() {
        assert_ne!(MemoryRegionId::new(), MemoryRegionId::new());
    }
}
