//! # Simulated Kernel
//!
//! This crate provides a simulated implementation of the kernel API.
//!
//! ## Purpose
//!
//! The simulated kernel allows testing device modules without a real kernel:
//! - Runs under `cargo test`
//! - Deterministic (seeded randomness, no real concurrency)
//! - Fast (no real I/O or context switches)
//! - Inspectable (all state is accessible)
//!
//! It models the pieces a character device driver touches: device-number
//! regions, the character-device table, device nodes, open files with
//! kernel-owned offsets, per-process user memory, the random source and the
//! kernel log.

pub mod address_space;
pub mod fault_injection;
pub mod random;
pub mod test_utils;

use address_space::{AddressSpace, UserSliceWriter};
use core_types::{DeviceNumber, FileId, MemoryPerms, ProcessId, UserAddr};
use fault_injection::FaultInjector;
use kernel_api::{
    CharDeviceRegistry, FileContext, FileOperations, KernelError, KernelModule, ModuleHost,
    OpenMode, RandomSource, SeekFrom,
};
use klog::{KernelLog, LogEntry};
use random::SeededRandom;
use std::collections::{BTreeMap, HashMap};

/// Where the kernel's random sources draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyMode {
    /// Deterministic streams derived from a seed
    Seeded(u64),
    /// Operating-system entropy
    Os,
}

/// A claimed range of device numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChrdevRegion {
    pub first: DeviceNumber,
    pub count: u32,
    pub name: String,
}

impl ChrdevRegion {
    fn contains(&self, dev: DeviceNumber) -> bool {
        dev.major() == self.first.major()
            && dev.minor() >= self.first.minor()
            && dev.minor() - self.first.minor() < self.count
    }

    fn overlaps(&self, first: DeviceNumber, count: u32) -> bool {
        if first.major() != self.first.major() {
            return false;
        }
        let (a0, a1) = (self.first.minor() as u64, self.first.minor() as u64 + self.count as u64);
        let (b0, b1) = (first.minor() as u64, first.minor() as u64 + count as u64);
        a0 < b1 && b0 < a1
    }
}

struct CharDevice {
    region: ChrdevRegion,
    ops: Box<dyn FileOperations>,
}

#[derive(Debug)]
struct OpenFile {
    context: FileContext,
    /// First device number of the cdev serving this file
    cdev: DeviceNumber,
    offset: u64,
}

/// Simulated kernel state
///
/// Unlike a real kernel, this state is directly accessible for testing.
pub struct SimulatedKernel {
    /// Claimed device-number ranges
    regions: Vec<ChrdevRegion>,
    /// Live character devices, keyed by first device number
    cdevs: BTreeMap<DeviceNumber, CharDevice>,
    /// Device nodes: path -> device number
    nodes: HashMap<String, DeviceNumber>,
    /// Process address spaces
    processes: HashMap<ProcessId, AddressSpace>,
    /// Open file table
    files: BTreeMap<FileId, OpenFile>,
    next_file: u64,
    /// Names of loaded modules
    modules: Vec<&'static str>,
    log: KernelLog,
    entropy: EntropyMode,
    sources_issued: u64,
    fault_injector: Option<FaultInjector>,
}

impl SimulatedKernel {
    /// Creates a new simulated kernel with seed 0
    pub fn new() -> Self {
        Self::with_entropy(EntropyMode::Seeded(0))
    }

    pub fn with_entropy(entropy: EntropyMode) -> Self {
        Self {
            regions: Vec::new(),
            cdevs: BTreeMap::new(),
            nodes: HashMap::new(),
            processes: HashMap::new(),
            files: BTreeMap::new(),
            next_file: 1,
            modules: Vec::new(),
            log: KernelLog::new(),
            entropy,
            sources_issued: 0,
            fault_injector: None,
        }
    }

    /// Sets the fault injector for this kernel
    pub fn with_fault_injector(mut self, injector: FaultInjector) -> Self {
        self.fault_injector = Some(injector);
        self
    }

    /// Returns the kernel log (`dmesg`)
    pub fn log(&self) -> &KernelLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut KernelLog {
        &mut self.log
    }

    /// Returns the fault injector, if one is installed
    pub fn fault_injector(&self) -> Option<&FaultInjector> {
        self.fault_injector.as_ref()
    }

    // --- modules -----------------------------------------------------------

    /// Loads a module (`insmod`)
    ///
    /// # Errors
    /// Returns `KernelError::AlreadyExists` if a module with the same name
    /// is loaded, or whatever the module's `init` returned.
    pub fn load_module<M: KernelModule>(&mut self, params: M::Params) -> Result<M, KernelError> {
        if self.is_module_loaded(M::NAME) {
            return Err(KernelError::AlreadyExists(M::NAME.to_string()));
        }
        let module = M::init(self, params)?;
        self.modules.push(M::NAME);
        Ok(module)
    }

    /// Unloads a module (`rmmod`)
    pub fn unload_module<M: KernelModule>(&mut self, module: M) {
        module.exit(self);
        self.modules.retain(|name| *name != M::NAME);
    }

    pub fn is_module_loaded(&self, name: &str) -> bool {
        self.modules.iter().any(|m| *m == name)
    }

    // --- device-number and cdev inspection ---------------------------------

    /// Returns the region claiming `dev`, if any
    pub fn region_for(&self, dev: DeviceNumber) -> Option<&ChrdevRegion> {
        self.regions.iter().find(|r| r.contains(dev))
    }

    /// Returns true if a driver is attached to `dev`
    pub fn has_cdev(&self, dev: DeviceNumber) -> bool {
        self.cdev_for(dev).is_some()
    }

    fn cdev_for(&self, dev: DeviceNumber) -> Option<DeviceNumber> {
        self.cdevs
            .values()
            .find(|c| c.region.contains(dev))
            .map(|c| c.region.first)
    }

    // --- device nodes ------------------------------------------------------

    /// Creates a character special file (`mknod`)
    pub fn mknod(&mut self, path: &str, dev: DeviceNumber) -> Result<(), KernelError> {
        if self.nodes.contains_key(path) {
            return Err(KernelError::AlreadyExists(path.to_string()));
        }
        self.nodes.insert(path.to_string(), dev);
        Ok(())
    }

    /// Removes a device node (`unlink`)
    pub fn unlink(&mut self, path: &str) -> Result<(), KernelError> {
        self.nodes
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| KernelError::NotFound(path.to_string()))
    }

    pub fn node(&self, path: &str) -> Option<DeviceNumber> {
        self.nodes.get(path).copied()
    }

    // --- processes and user memory -----------------------------------------

    /// Creates a process with an empty address space
    pub fn spawn_process(&mut self) -> ProcessId {
        let pid = ProcessId::new();
        self.processes.insert(pid, AddressSpace::new(pid));
        pid
    }

    /// Exits a process, closing its files and dropping its memory
    pub fn exit_process(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let owned: Vec<FileId> = self
            .files
            .iter()
            .filter(|(_, f)| f.context.process == pid)
            .map(|(id, _)| *id)
            .collect();
        for file in owned {
            self.close(file)?;
        }
        self.processes
            .remove(&pid)
            .map(|_| ())
            .ok_or_else(|| KernelError::NotFound(pid.to_string()))
    }

    /// Maps user memory into a process (`mmap`)
    pub fn map(
        &mut self,
        pid: ProcessId,
        len: u64,
        perms: MemoryPerms,
    ) -> Result<UserAddr, KernelError> {
        self.space_mut(pid)?.map(len, perms)
    }

    /// Unmaps user memory (`munmap`)
    pub fn unmap(&mut self, pid: ProcessId, addr: UserAddr) -> Result<(), KernelError> {
        self.space_mut(pid)?.unmap(addr)
    }

    /// Inspects user memory, ignoring permissions
    pub fn peek(&self, pid: ProcessId, addr: UserAddr, len: usize) -> Option<&[u8]> {
        self.processes.get(&pid)?.peek(addr, len)
    }

    pub fn address_space(&self, pid: ProcessId) -> Option<&AddressSpace> {
        self.processes.get(&pid)
    }

    fn space_mut(&mut self, pid: ProcessId) -> Result<&mut AddressSpace, KernelError> {
        self.processes
            .get_mut(&pid)
            .ok_or_else(|| KernelError::NotFound(pid.to_string()))
    }

    // --- file system calls -------------------------------------------------

    /// Opens a device node (`open`)
    ///
    /// # Errors
    /// - `NotFound` if there is no such node or process
    /// - `NoDevice` if no driver is attached to the node's device number
    /// - whatever the driver's `open` returns
    pub fn open(&mut self, pid: ProcessId, path: &str, mode: OpenMode) -> Result<FileId, KernelError> {
        if !self.processes.contains_key(&pid) {
            return Err(KernelError::NotFound(pid.to_string()));
        }
        let dev = self
            .node(path)
            .ok_or_else(|| KernelError::NotFound(path.to_string()))?;
        let cdev_first = self.cdev_for(dev).ok_or(KernelError::NoDevice(dev))?;

        let file_id = FileId::from_raw(self.next_file);
        let context = FileContext {
            file_id,
            process: pid,
            device: dev,
            mode,
        };

        let cdev = self
            .cdevs
            .get_mut(&cdev_first)
            .ok_or(KernelError::NoDevice(dev))?;
        cdev.ops.open(&context)?;

        self.next_file += 1;
        self.files.insert(
            file_id,
            OpenFile {
                context,
                cdev: cdev_first,
                offset: 0,
            },
        );
        Ok(file_id)
    }

    /// Reads from an open file into user memory (`read`)
    ///
    /// Returns the number of bytes the driver copied.
    pub fn read(&mut self, file: FileId, buf: UserAddr, count: usize) -> Result<usize, KernelError> {
        let open = self.files.get_mut(&file).ok_or(KernelError::BadFile(file))?;
        if !open.context.mode.readable() {
            return Err(KernelError::BadFile(file));
        }
        let cdev = self
            .cdevs
            .get_mut(&open.cdev)
            .ok_or(KernelError::NoDevice(open.context.device))?;
        let space = self
            .processes
            .get_mut(&open.context.process)
            .ok_or_else(|| KernelError::NotFound(open.context.process.to_string()))?;

        let mut writer = UserSliceWriter::new(space, buf, count, self.fault_injector.as_mut());
        cdev.ops.read(&open.context, &mut writer, &mut open.offset)
    }

    /// Writes user memory to an open file (`write`)
    pub fn write(&mut self, file: FileId, buf: UserAddr, count: usize) -> Result<usize, KernelError> {
        let open = self.files.get_mut(&file).ok_or(KernelError::BadFile(file))?;
        if !open.context.mode.writable() {
            return Err(KernelError::BadFile(file));
        }
        let space = self
            .processes
            .get_mut(&open.context.process)
            .ok_or_else(|| KernelError::NotFound(open.context.process.to_string()))?;
        let data = space.copy_from_user(buf, count)?;
        let cdev = self
            .cdevs
            .get_mut(&open.cdev)
            .ok_or(KernelError::NoDevice(open.context.device))?;
        cdev.ops.write(&open.context, &data, &mut open.offset)
    }

    /// Repositions the file offset (`lseek`)
    pub fn lseek(&mut self, file: FileId, pos: SeekFrom) -> Result<u64, KernelError> {
        let open = self.files.get_mut(&file).ok_or(KernelError::BadFile(file))?;
        let cdev = self
            .cdevs
            .get_mut(&open.cdev)
            .ok_or(KernelError::NoDevice(open.context.device))?;
        cdev.ops.llseek(&open.context, pos, &mut open.offset)
    }

    /// Device control (`ioctl`)
    pub fn ioctl(&mut self, file: FileId, cmd: u32, arg: u64) -> Result<i64, KernelError> {
        let open = self.files.get(&file).ok_or(KernelError::BadFile(file))?;
        let cdev = self
            .cdevs
            .get_mut(&open.cdev)
            .ok_or(KernelError::NoDevice(open.context.device))?;
        cdev.ops.ioctl(&open.context, cmd, arg)
    }

    /// Closes an open file (`close`)
    pub fn close(&mut self, file: FileId) -> Result<(), KernelError> {
        let open = self.files.remove(&file).ok_or(KernelError::BadFile(file))?;
        if let Some(cdev) = self.cdevs.get_mut(&open.cdev) {
            cdev.ops.release(&open.context);
        }
        Ok(())
    }

    /// Returns the kernel-held offset of an open file
    pub fn file_offset(&self, file: FileId) -> Option<u64> {
        self.files.get(&file).map(|f| f.offset)
    }

    /// Number of files currently open
    pub fn open_file_count(&self) -> usize {
        self.files.len()
    }
}

impl Default for SimulatedKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl CharDeviceRegistry for SimulatedKernel {
    fn register_chrdev_region(
        &mut self,
        first: DeviceNumber,
        count: u32,
        name: &str,
    ) -> Result<(), KernelError> {
        if count == 0 || first.offset(count - 1).is_none() {
            return Err(KernelError::InvalidArgument(format!(
                "bad device number range {} +{}",
                first, count
            )));
        }
        if let Some(existing) = self.regions.iter().find(|r| r.overlaps(first, count)) {
            return Err(KernelError::Busy(format!(
                "{} already claimed by {}",
                first, existing.name
            )));
        }
        if let Some(injector) = self.fault_injector.as_mut() {
            if injector.should_fail_region_claim() {
                return Err(KernelError::Busy(format!("{} (injected)", first)));
            }
        }
        self.regions.push(ChrdevRegion {
            first,
            count,
            name: name.to_string(),
        });
        Ok(())
    }

    fn unregister_chrdev_region(&mut self, first: DeviceNumber, count: u32) {
        self.regions
            .retain(|r| !(r.first == first && r.count == count));
    }

    fn cdev_add(
        &mut self,
        first: DeviceNumber,
        count: u32,
        ops: Box<dyn FileOperations>,
    ) -> Result<(), KernelError> {
        if count == 0 || first.offset(count - 1).is_none() {
            return Err(KernelError::InvalidArgument(format!(
                "bad device number range {} +{}",
                first, count
            )));
        }
        if self.cdevs.values().any(|c| c.region.overlaps(first, count)) {
            return Err(KernelError::Busy(format!("{} already has a driver", first)));
        }
        if let Some(injector) = self.fault_injector.as_mut() {
            if injector.should_fail_cdev_add() {
                return Err(KernelError::OutOfMemory);
            }
        }
        let name = self
            .region_for(first)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        self.cdevs.insert(
            first,
            CharDevice {
                region: ChrdevRegion { first, count, name },
                ops,
            },
        );
        Ok(())
    }

    fn cdev_del(&mut self, first: DeviceNumber) -> Option<Box<dyn FileOperations>> {
        let mut cdev = self.cdevs.remove(&first)?;
        let stale: Vec<FileId> = self
            .files
            .iter()
            .filter(|(_, f)| f.cdev == first)
            .map(|(id, _)| *id)
            .collect();
        if !stale.is_empty() {
            self.log.record(
                LogEntry::new(klog::LogLevel::Warning, "releasing files on removed device")
                    .with_field("device", first)
                    .with_field("files", stale.len()),
            );
        }
        for id in stale {
            if let Some(open) = self.files.remove(&id) {
                cdev.ops.release(&open.context);
            }
        }
        Some(cdev.ops)
    }
}

impl ModuleHost for SimulatedKernel {
    fn printk(&mut self, entry: LogEntry) {
        self.log.record(entry);
    }

    fn random_source(&mut self) -> Box<dyn RandomSource> {
        let stream = self.sources_issued;
        self.sources_issued += 1;
        match self.entropy {
            EntropyMode::Seeded(seed) => Box::new(SeededRandom::fork(seed, stream)),
            EntropyMode::Os => Box::new(rand_core::OsRng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_api::UserWriter;

    /// Driver that serves a fixed byte string, like a tiny read-only file
    struct Fixed(&'static [u8]);

    impl FileOperations for Fixed {
        fn read(
            &mut self,
            _file: &FileContext,
            writer: &mut dyn UserWriter,
            offset: &mut u64,
        ) -> Result<usize, KernelError> {
            let start = (*offset as usize).min(self.0.len());
            let n = writer.len().min(self.0.len() - start);
            writer.write_slice(&self.0[start..start + n])?;
            *offset += n as u64;
            Ok(n)
        }
    }

    fn dev() -> DeviceNumber {
        DeviceNumber::mkdev(42, 0)
    }

    fn kernel_with_fixed() -> SimulatedKernel {
        let mut kernel = SimulatedKernel::new();
        kernel.register_chrdev_region(dev(), 1, "fixed").unwrap();
        kernel.cdev_add(dev(), 1, Box::new(Fixed(b"hello"))).unwrap();
        kernel.mknod("/dev/fixed", dev()).unwrap();
        kernel
    }

    #[test]
    fn test_region_claims_are_exclusive() {
        let mut kernel = SimulatedKernel::new();
        kernel.register_chrdev_region(dev(), 2, "a").unwrap();

        let overlap = DeviceNumber::mkdev(42, 1);
        assert!(matches!(
            kernel.register_chrdev_region(overlap, 1, "b"),
            Err(KernelError::Busy(_))
        ));
        kernel
            .register_chrdev_region(DeviceNumber::mkdev(42, 2), 1, "c")
            .unwrap();
        kernel
            .register_chrdev_region(DeviceNumber::mkdev(43, 0), 1, "d")
            .unwrap();

        kernel.unregister_chrdev_region(dev(), 2);
        assert!(kernel.region_for(overlap).is_none());
        kernel.register_chrdev_region(overlap, 1, "b").unwrap();
    }

    #[test]
    fn test_region_rejects_bad_range() {
        let mut kernel = SimulatedKernel::new();
        assert!(matches!(
            kernel.register_chrdev_region(dev(), 0, "x"),
            Err(KernelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_open_read_close() {
        let mut kernel = kernel_with_fixed();
        let pid = kernel.spawn_process();
        let buf = kernel.map(pid, 16, MemoryPerms::read_write()).unwrap();

        let file = kernel.open(pid, "/dev/fixed", OpenMode::ReadOnly).unwrap();
        assert_eq!(kernel.read(file, buf, 3).unwrap(), 3);
        assert_eq!(kernel.file_offset(file), Some(3));
        assert_eq!(kernel.read(file, buf.checked_add(3).unwrap(), 16).unwrap(), 2);
        assert_eq!(kernel.read(file, buf, 16).unwrap(), 0);
        assert_eq!(kernel.peek(pid, buf, 5).unwrap(), b"hello");

        kernel.close(file).unwrap();
        assert_eq!(kernel.read(file, buf, 1), Err(KernelError::BadFile(file)));
    }

    #[test]
    fn test_open_without_driver_is_no_device() {
        let mut kernel = SimulatedKernel::new();
        let pid = kernel.spawn_process();
        kernel.mknod("/dev/ghost", dev()).unwrap();
        assert_eq!(
            kernel.open(pid, "/dev/ghost", OpenMode::ReadOnly),
            Err(KernelError::NoDevice(dev()))
        );
        assert!(matches!(
            kernel.open(pid, "/dev/missing", OpenMode::ReadOnly),
            Err(KernelError::NotFound(_))
        ));
    }

    #[test]
    fn test_unimplemented_operations_not_supported() {
        let mut kernel = kernel_with_fixed();
        let pid = kernel.spawn_process();
        let buf = kernel.map(pid, 4, MemoryPerms::read_write()).unwrap();
        let file = kernel.open(pid, "/dev/fixed", OpenMode::ReadWrite).unwrap();

        assert_eq!(kernel.write(file, buf, 4), Err(KernelError::NotSupported));
        assert_eq!(
            kernel.lseek(file, SeekFrom::Start(0)),
            Err(KernelError::NotSupported)
        );
        assert_eq!(kernel.ioctl(file, 1, 0), Err(KernelError::NotSupported));
    }

    #[test]
    fn test_write_on_read_only_file_is_bad_file() {
        let mut kernel = kernel_with_fixed();
        let pid = kernel.spawn_process();
        let buf = kernel.map(pid, 4, MemoryPerms::read_write()).unwrap();
        let file = kernel.open(pid, "/dev/fixed", OpenMode::ReadOnly).unwrap();
        assert_eq!(kernel.write(file, buf, 4), Err(KernelError::BadFile(file)));
    }

    #[test]
    fn test_cdev_add_conflict_is_busy() {
        let mut kernel = kernel_with_fixed();
        assert!(matches!(
            kernel.cdev_add(dev(), 1, Box::new(Fixed(b"x"))),
            Err(KernelError::Busy(_))
        ));
    }

    #[test]
    fn test_cdev_del_releases_open_files() {
        let mut kernel = kernel_with_fixed();
        let pid = kernel.spawn_process();
        let file = kernel.open(pid, "/dev/fixed", OpenMode::ReadOnly).unwrap();

        assert!(kernel.cdev_del(dev()).is_some());
        assert_eq!(kernel.open_file_count(), 0);
        assert!(kernel.log().contains_message("releasing files"));
        assert_eq!(kernel.close(file), Err(KernelError::BadFile(file)));
        assert!(kernel.cdev_del(dev()).is_none());
    }

    #[test]
    fn test_exit_process_closes_files() {
        let mut kernel = kernel_with_fixed();
        let pid = kernel.spawn_process();
        kernel.open(pid, "/dev/fixed", OpenMode::ReadOnly).unwrap();
        kernel.open(pid, "/dev/fixed", OpenMode::ReadOnly).unwrap();
        assert_eq!(kernel.open_file_count(), 2);

        kernel.exit_process(pid).unwrap();
        assert_eq!(kernel.open_file_count(), 0);
        assert!(kernel.address_space(pid).is_none());
    }

    #[test]
    fn test_random_sources_are_independent_streams() {
        let mut kernel = SimulatedKernel::with_entropy(EntropyMode::Seeded(5));
        let mut a = kernel.random_source();
        let mut b = kernel.random_source();
        let xs: Vec<u32> = (0..4).map(|_| a.random_u32()).collect();
        let ys: Vec<u32> = (0..4).map(|_| b.random_u32()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_printk_records_entry() {
        let mut kernel = SimulatedKernel::new();
        kernel.printk(LogEntry::info("hello"));
        assert_eq!(kernel.log().len(), 1);
    }
}
