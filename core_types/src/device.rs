//! Device numbers
//!
//! A device number is the (major, minor) pair the kernel uses to route file
//! operations on a device node to the driver that registered it. The packed
//! encoding matches Linux's in-kernel `dev_t`: 12 bits of major above 20 bits
//! of minor.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of bits used by the minor part of a packed device number
pub const MINOR_BITS: u32 = 20;

/// Largest valid major number
pub const MAJOR_MAX: u32 = (1 << (32 - MINOR_BITS)) - 1;

/// Largest valid minor number
pub const MINOR_MAX: u32 = (1 << MINOR_BITS) - 1;

/// Errors constructing a device number
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeviceNumberError {
    #[error("major number {0} exceeds 4095")]
    MajorOutOfRange(u32),

    #[error("minor number {0} exceeds 1048575")]
    MinorOutOfRange(u32),
}

/// A (major, minor) device number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceNumber(u32);

impl DeviceNumber {
    /// Builds a device number, checking both halves fit their bit fields
    pub fn new(major: u32, minor: u32) -> Result<Self, DeviceNumberError> {
        if major > MAJOR_MAX {
            return Err(DeviceNumberError::MajorOutOfRange(major));
        }
        if minor > MINOR_MAX {
            return Err(DeviceNumberError::MinorOutOfRange(minor));
        }
        Ok(Self::mkdev(major, minor))
    }

    /// Packs a major and minor without range checks (`MKDEV`)
    ///
    /// Out-of-range bits are masked off.
    pub const fn mkdev(major: u32, minor: u32) -> Self {
        Self(((major & MAJOR_MAX) << MINOR_BITS) | (minor & MINOR_MAX))
    }

    /// Rebuilds a device number from its packed form
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the packed form
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns the major number (`MAJOR`)
    pub const fn major(&self) -> u32 {
        self.0 >> MINOR_BITS
    }

    /// Returns the minor number (`MINOR`)
    pub const fn minor(&self) -> u32 {
        self.0 & MINOR_MAX
    }

    /// Returns the device number `offset` minors past this one
    ///
    /// Returns `None` when the result would leave this major.
    pub fn offset(&self, offset: u32) -> Option<Self> {
        let minor = self.minor().checked_add(offset)?;
        if minor > MINOR_MAX {
            return None;
        }
        Some(Self::mkdev(self.major(), minor))
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major(), self.minor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mkdev_packs_major_and_minor() {
        let dev = DeviceNumber::mkdev(42, 0);
        assert_eq!(dev.major(), 42);
        assert_eq!(dev.minor(), 0);
        assert_eq!(dev.raw(), 42 << 20);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert_eq!(
            DeviceNumber::new(MAJOR_MAX + 1, 0),
            Err(DeviceNumberError::MajorOutOfRange(MAJOR_MAX + 1))
        );
        assert_eq!(
            DeviceNumber::new(1, MINOR_MAX + 1),
            Err(DeviceNumberError::MinorOutOfRange(MINOR_MAX + 1))
        );
        assert!(DeviceNumber::new(MAJOR_MAX, MINOR_MAX).is_ok());
    }

    #[test]
    fn test_offset_stays_within_major() {
        let dev = DeviceNumber::mkdev(42, 3);
        assert_eq!(dev.offset(2), Some(DeviceNumber::mkdev(42, 5)));
        assert_eq!(DeviceNumber::mkdev(42, MINOR_MAX).offset(1), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceNumber::mkdev(42, 7).to_string(), "42:7");
    }

    #[test]
    fn test_serde_uses_packed_form() {
        let dev = DeviceNumber::mkdev(1, 9);
        let json = serde_json::to_string(&dev).unwrap();
        assert_eq!(json, (1u32 << 20 | 9).to_string());
        let back: DeviceNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dev);
    }
}
