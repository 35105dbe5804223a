//! User address spaces for SimulatedKernel
//!
//! Each simulated process owns an address space made of mapped regions.
//! Regions are backed by plain byte vectors and separated by an unmapped
//! guard page, so a copy that runs past the end of one region always faults
//! instead of spilling into the next.

use crate::fault_injection::FaultInjector;
use core_types::{MemoryPerms, MemoryRegionId, ProcessId, UserAddr};
use kernel_api::{KernelError, UserWriter};
use serde::{Deserialize, Serialize};

/// Mapping granularity
pub const PAGE_SIZE: u64 = 4096;

/// Address of the first mapping in every address space
pub const USER_BASE: u64 = 0x1000_0000;

/// Direction of a copy across the user boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserAccess {
    /// Kernel writes into user memory (`copy_to_user`)
    CopyTo,
    /// Kernel reads from user memory (`copy_from_user`)
    CopyFrom,
}

/// Address space audit events (test-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSpaceEvent {
    /// Region mapped
    RegionMapped {
        process: ProcessId,
        region_id: MemoryRegionId,
        base: UserAddr,
        len: u64,
        permissions: MemoryPerms,
    },
    /// Region unmapped
    RegionUnmapped {
        process: ProcessId,
        region_id: MemoryRegionId,
    },
    /// Copy across the boundary attempted
    AccessAttempted {
        process: ProcessId,
        addr: UserAddr,
        len: u64,
        access: UserAccess,
        allowed: bool,
    },
}

/// Audit log for address space operations
#[derive(Debug, Clone, Default)]
pub struct AddressSpaceAuditLog {
    events: Vec<AddressSpaceEvent>,
}

impl AddressSpaceAuditLog {
    /// Creates a new empty audit log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records an event
    pub fn record(&mut self, event: AddressSpaceEvent) {
        self.events.push(event);
    }

    /// Returns all recorded events
    pub fn events(&self) -> &[AddressSpaceEvent] {
        &self.events
    }

    /// Checks if an event matching the predicate exists
    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&AddressSpaceEvent) -> bool,
    {
        self.events.iter().any(predicate)
    }
}

/// A mapped region of user memory
#[derive(Debug, Clone)]
struct UserRegion {
    id: MemoryRegionId,
    base: UserAddr,
    permissions: MemoryPerms,
    data: Vec<u8>,
}

impl UserRegion {
    /// Byte range within `data` for `[addr, addr + len)`, if fully inside
    fn span(&self, addr: UserAddr, len: usize) -> Option<std::ops::Range<usize>> {
        let start = addr.raw().checked_sub(self.base.raw())?;
        let end = start.checked_add(len as u64)?;
        if end > self.data.len() as u64 {
            return None;
        }
        Some(start as usize..end as usize)
    }
}

/// The user address space of one process
#[derive(Debug, Clone)]
pub struct AddressSpace {
    process: ProcessId,
    regions: Vec<UserRegion>,
    next_base: u64,
    audit_log: AddressSpaceAuditLog,
}

impl AddressSpace {
    /// Creates an empty address space for `process`
    pub fn new(process: ProcessId) -> Self {
        Self {
            process,
            regions: Vec::new(),
            next_base: USER_BASE,
            audit_log: AddressSpaceAuditLog::new(),
        }
    }

    /// Maps `len` zeroed bytes with the given permissions
    ///
    /// # Errors
    /// Returns `KernelError::InvalidArgument` for a zero length and
    /// `KernelError::OutOfMemory` once the address space is exhausted.
    pub fn map(&mut self, len: u64, permissions: MemoryPerms) -> Result<UserAddr, KernelError> {
        if len == 0 {
            return Err(KernelError::InvalidArgument(
                "cannot map an empty region".to_string(),
            ));
        }
        let pages = len.div_ceil(PAGE_SIZE);
        // One trailing guard page keeps regions from touching.
        let span = (pages + 1)
            .checked_mul(PAGE_SIZE)
            .ok_or(KernelError::OutOfMemory)?;
        let base = UserAddr::new(self.next_base);
        self.next_base = self
            .next_base
            .checked_add(span)
            .ok_or(KernelError::OutOfMemory)?;
        let size = usize::try_from(len).map_err(|_| KernelError::OutOfMemory)?;

        let region = UserRegion {
            id: MemoryRegionId::new(),
            base,
            permissions,
            data: vec![0; size],
        };
        self.audit_log.record(AddressSpaceEvent::RegionMapped {
            process: self.process,
            region_id: region.id,
            base,
            len,
            permissions,
        });
        self.regions.push(region);
        Ok(base)
    }

    /// Unmaps the region starting at `base`
    pub fn unmap(&mut self, base: UserAddr) -> Result<(), KernelError> {
        let index = self
            .regions
            .iter()
            .position(|r| r.base == base)
            .ok_or_else(|| KernelError::NotFound(format!("no mapping at {}", base)))?;
        let region = self.regions.remove(index);
        self.audit_log.record(AddressSpaceEvent::RegionUnmapped {
            process: self.process,
            region_id: region.id,
        });
        Ok(())
    }

    /// Copies `data` to user memory at `addr`, all or nothing
    ///
    /// # Errors
    /// Returns `KernelError::Fault` unless the whole destination lies inside
    /// one writable region.
    pub fn copy_to_user(&mut self, addr: UserAddr, data: &[u8]) -> Result<(), KernelError> {
        if data.is_empty() {
            return Ok(());
        }
        let target = self.regions.iter_mut().find_map(|r| {
            let range = r.span(addr, data.len())?;
            r.permissions.can_write().then_some((r, range))
        });
        let allowed = target.is_some();
        if let Some((region, range)) = target {
            region.data[range].copy_from_slice(data);
        }
        self.audit_log.record(AddressSpaceEvent::AccessAttempted {
            process: self.process,
            addr,
            len: data.len() as u64,
            access: UserAccess::CopyTo,
            allowed,
        });
        if allowed {
            Ok(())
        } else {
            Err(KernelError::Fault)
        }
    }

    /// Copies `len` bytes from user memory at `addr`
    ///
    /// # Errors
    /// Returns `KernelError::Fault` unless the whole source lies inside one
    /// readable region.
    pub fn copy_from_user(&mut self, addr: UserAddr, len: usize) -> Result<Vec<u8>, KernelError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let bytes = self.regions.iter().find_map(|r| {
            let range = r.span(addr, len)?;
            r.permissions.can_read().then(|| r.data[range].to_vec())
        });
        self.audit_log.record(AddressSpaceEvent::AccessAttempted {
            process: self.process,
            addr,
            len: len as u64,
            access: UserAccess::CopyFrom,
            allowed: bytes.is_some(),
        });
        bytes.ok_or(KernelError::Fault)
    }

    /// Reads user memory directly, ignoring permissions (test inspection)
    pub fn peek(&self, addr: UserAddr, len: usize) -> Option<&[u8]> {
        self.regions
            .iter()
            .find_map(|r| r.span(addr, len).map(|range| &r.data[range]))
    }

    /// Returns the audit log (test-only)
    pub fn audit_log(&self) -> &AddressSpaceAuditLog {
        &self.audit_log
    }
}

/// [`UserWriter`] over a destination region of a process's address space
///
/// This is what the kernel hands a driver's `read`. The writer covers
/// `[addr, addr + len)` exactly, as passed to the `read` call.
pub struct UserSliceWriter<'a> {
    space: &'a mut AddressSpace,
    pos: UserAddr,
    remaining: usize,
    faults: Option<&'a mut FaultInjector>,
}

impl<'a> UserSliceWriter<'a> {
    pub fn new(
        space: &'a mut AddressSpace,
        addr: UserAddr,
        len: usize,
        faults: Option<&'a mut FaultInjector>,
    ) -> Self {
        Self {
            space,
            pos: addr,
            remaining: len,
            faults,
        }
    }
}

impl UserWriter for UserSliceWriter<'_> {
    fn len(&self) -> usize {
        self.remaining
    }

    fn write_slice(&mut self, data: &[u8]) -> Result<(), KernelError> {
        if data.len() > self.remaining {
            return Err(KernelError::Fault);
        }
        if let Some(faults) = self.faults.as_deref_mut() {
            if faults.should_fault_user_copy() {
                return Err(KernelError::Fault);
            }
        }
        self.space.copy_to_user(self.pos, data)?;
        self.pos = self
            .pos
            .checked_add(data.len() as u64)
            .ok_or(KernelError::Fault)?;
        self.remaining -= data.len();
        Ok(())
    }
}
