//! Reads from `/dev/spg` through the simulated kernel's file layer

use core_types::{DeviceNumber, FileId, MemoryPerms, UserAddr};
use kernel_api::{KernelError, OpenMode, SeekFrom};
use sim_kernel::fault_injection::{FaultPlan, UserCopyFault};
use sim_kernel::test_utils::{with_fault_plan, Reader};
use sim_kernel::{EntropyMode, SimulatedKernel};
use spg::{charset, SpgConfig, SpgModule, PASSWORD_LEN};

const NODE: &str = "/dev/spg";

fn boot(kernel: &mut SimulatedKernel) -> SpgModule {
    let module = kernel.load_module::<SpgModule>(SpgConfig::default()).unwrap();
    kernel.mknod(NODE, module.device_number()).unwrap();
    module
}

fn open(kernel: &mut SimulatedKernel, reader: &Reader) -> FileId {
    kernel.open(reader.pid, NODE, OpenMode::ReadOnly).unwrap()
}

#[test]
fn test_full_read_returns_16_then_end_of_data() {
    let mut kernel = SimulatedKernel::with_entropy(EntropyMode::Seeded(1));
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 64).unwrap();
    let file = open(&mut kernel, &reader);

    let password = reader.read_once(&mut kernel, file, 64).unwrap();
    assert_eq!(password.len(), PASSWORD_LEN);
    assert!(password.iter().all(|b| charset::contains(*b)));
    assert_eq!(kernel.file_offset(file), Some(16));

    assert!(reader.read_once(&mut kernel, file, 64).unwrap().is_empty());
    assert_eq!(kernel.file_offset(file), Some(16));
    kernel.close(file).unwrap();
}

#[test]
fn test_chunked_reads_concatenate_to_password() {
    let mut kernel = SimulatedKernel::with_entropy(EntropyMode::Seeded(2));
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 5).unwrap();
    let file = open(&mut kernel, &reader);

    let chunks = reader.read_chunks(&mut kernel, file, 5).unwrap();
    let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![5, 5, 5, 1]);

    let joined = chunks.concat();
    assert_eq!(joined.len(), PASSWORD_LEN);
    assert!(joined.iter().all(|b| charset::contains(*b)));
}

#[test]
fn test_zero_count_read_returns_zero() {
    let mut kernel = SimulatedKernel::new();
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 16).unwrap();
    let file = open(&mut kernel, &reader);

    assert_eq!(kernel.read(file, reader.buf, 0), Ok(0));
    assert_eq!(kernel.file_offset(file), Some(0));
    assert_eq!(kernel.read(file, reader.buf, 16), Ok(16));
}

#[test]
fn test_fault_on_unmapped_buffer_keeps_offset() {
    let mut kernel = SimulatedKernel::with_entropy(EntropyMode::Seeded(3));
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 16).unwrap();
    let file = open(&mut kernel, &reader);

    assert_eq!(kernel.read(file, UserAddr::NULL, 16), Err(KernelError::Fault));
    assert_eq!(kernel.read(file, UserAddr::new(0x10), 16), Err(KernelError::Fault));
    assert_eq!(kernel.file_offset(file), Some(0));

    // The retry gets the whole password.
    let password = reader.read_once(&mut kernel, file, 16).unwrap();
    assert_eq!(password.len(), PASSWORD_LEN);
}

#[test]
fn test_fault_on_read_only_buffer_mid_stream() {
    let mut kernel = SimulatedKernel::with_entropy(EntropyMode::Seeded(4));
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 16).unwrap();
    let ro = kernel.map(reader.pid, 16, MemoryPerms::read_only()).unwrap();
    let file = open(&mut kernel, &reader);

    let head = reader.read_once(&mut kernel, file, 6).unwrap();
    assert_eq!(head.len(), 6);

    assert_eq!(kernel.read(file, ro, 10), Err(KernelError::Fault));
    assert_eq!(kernel.file_offset(file), Some(6));
    assert_eq!(kernel.peek(reader.pid, ro, 10), Some(&[0u8; 10][..]));

    let tail = reader.read_once(&mut kernel, file, 16).unwrap();
    assert_eq!(tail.len(), 10);
    assert_eq!(kernel.file_offset(file), Some(16));
}

#[test]
fn test_count_larger_than_mapping_faults_without_partial_copy() {
    let mut kernel = SimulatedKernel::new();
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 4).unwrap();
    let file = open(&mut kernel, &reader);

    assert_eq!(kernel.read(file, reader.buf, 16), Err(KernelError::Fault));
    assert_eq!(kernel.file_offset(file), Some(0));
    assert_eq!(kernel.peek(reader.pid, reader.buf, 4), Some(&[0u8; 4][..]));
}

#[test]
fn test_injected_copy_faults_then_retry() {
    let plan = FaultPlan::new().with_user_copy_fault(UserCopyFault::FailAfter { after: 1, count: 2 });
    with_fault_plan(plan, |kernel| {
        let _module = boot(kernel);
        let reader = Reader::spawn(kernel, 8).unwrap();
        let file = open(kernel, &reader);

        assert_eq!(reader.read_once(kernel, file, 8).unwrap().len(), 8);
        assert_eq!(kernel.read(file, reader.buf, 8), Err(KernelError::Fault));
        assert_eq!(kernel.read(file, reader.buf, 8), Err(KernelError::Fault));
        assert_eq!(kernel.file_offset(file), Some(8));

        assert_eq!(reader.read_once(kernel, file, 8).unwrap().len(), 8);
        assert!(reader.read_once(kernel, file, 8).unwrap().is_empty());
        assert_eq!(kernel.fault_injector().map(|f| f.faults_fired()), Some(2));
    });
}

#[test]
fn test_sequential_opens_each_get_fresh_password() {
    let mut kernel = SimulatedKernel::with_entropy(EntropyMode::Seeded(5));
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 64).unwrap();

    let mut passwords = Vec::new();
    for _ in 0..2 {
        let file = open(&mut kernel, &reader);
        passwords.push(reader.read_once(&mut kernel, file, 64).unwrap());
        kernel.close(file).unwrap();
    }
    assert_eq!(passwords[0].len(), PASSWORD_LEN);
    assert_eq!(passwords[1].len(), PASSWORD_LEN);
    assert_ne!(passwords[0], passwords[1]);
}

#[test]
fn test_write_seek_and_ioctl_are_not_supported() {
    let mut kernel = SimulatedKernel::new();
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 16).unwrap();
    let file = kernel.open(reader.pid, NODE, OpenMode::ReadWrite).unwrap();

    assert_eq!(kernel.write(file, reader.buf, 4), Err(KernelError::NotSupported));
    assert_eq!(kernel.lseek(file, SeekFrom::Start(0)), Err(KernelError::NotSupported));
    assert_eq!(kernel.ioctl(file, 0x5401, 0), Err(KernelError::NotSupported));
    assert_eq!(KernelError::NotSupported.errno(), -95);

    // None of those moved the offset.
    assert_eq!(kernel.file_offset(file), Some(0));
    assert_eq!(reader.read_once(&mut kernel, file, 16).unwrap().len(), 16);
}

#[test]
fn test_open_missing_node() {
    let mut kernel = SimulatedKernel::new();
    let _module = boot(&mut kernel);
    let reader = Reader::spawn(&mut kernel, 16).unwrap();
    assert!(matches!(
        kernel.open(reader.pid, "/dev/nope", OpenMode::ReadOnly),
        Err(KernelError::NotFound(_))
    ));
}

#[test]
fn test_other_minor_has_no_driver() {
    let mut kernel = SimulatedKernel::new();
    let _module = boot(&mut kernel);
    let other = DeviceNumber::mkdev(42, 1);
    kernel.mknod("/dev/spg1", other).unwrap();
    let reader = Reader::spawn(&mut kernel, 16).unwrap();
    assert_eq!(
        kernel.open(reader.pid, "/dev/spg1", OpenMode::ReadOnly),
        Err(KernelError::NoDevice(other))
    );
}
