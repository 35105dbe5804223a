//! Test utilities for driver tests
//!
//! Helpers for the steps nearly every device test repeats: building a
//! kernel with faults armed, spawning a reader with a user buffer, and
//! draining an open file.

use crate::fault_injection::{FaultInjector, FaultPlan};
use crate::SimulatedKernel;
use core_types::{FileId, MemoryPerms, ProcessId, UserAddr};
use kernel_api::KernelError;

/// Runs a test with a fault plan applied
///
/// # Example
///
/// ```
/// use sim_kernel::test_utils::with_fault_plan;
/// use sim_kernel::fault_injection::{FaultPlan, RegistrationFault};
///
/// with_fault_plan(
///     FaultPlan::new().with_registration_fault(RegistrationFault::FailCdevAdd),
///     |kernel| {
///         assert_eq!(kernel.open_file_count(), 0);
///     },
/// );
/// ```
pub fn with_fault_plan<F>(plan: FaultPlan, f: F)
where
    F: FnOnce(&mut SimulatedKernel),
{
    let mut kernel = SimulatedKernel::new().with_fault_injector(FaultInjector::new(plan));
    f(&mut kernel);
}

/// A process with one writable buffer mapped, ready to issue reads
#[derive(Debug, Clone, Copy)]
pub struct Reader {
    pub pid: ProcessId,
    pub buf: UserAddr,
    pub len: usize,
}

impl Reader {
    /// Spawns a process and maps `len` bytes read-write into it
    pub fn spawn(kernel: &mut SimulatedKernel, len: usize) -> Result<Self, KernelError> {
        let pid = kernel.spawn_process();
        let buf = kernel.map(pid, len as u64, MemoryPerms::read_write())?;
        Ok(Self { pid, buf, len })
    }

    /// Reads once into the start of the buffer, returning the bytes copied
    pub fn read_once(
        &self,
        kernel: &mut SimulatedKernel,
        file: FileId,
        count: usize,
    ) -> Result<Vec<u8>, KernelError> {
        let n = kernel.read(file, self.buf, count)?;
        Ok(kernel
            .peek(self.pid, self.buf, n)
            .map(<[u8]>::to_vec)
            .unwrap_or_default())
    }

    /// Reads in `chunk`-sized calls until end of data
    ///
    /// Returns each chunk as it was received.
    pub fn read_chunks(
        &self,
        kernel: &mut SimulatedKernel,
        file: FileId,
        chunk: usize,
    ) -> Result<Vec<Vec<u8>>, KernelError> {
        let mut chunks = Vec::new();
        loop {
            let bytes = self.read_once(kernel, file, chunk.min(self.len))?;
            if bytes.is_empty() {
                return Ok(chunks);
            }
            chunks.push(bytes);
        }
    }
}
