//! Host runtime for the spg module
//!
//! Boots a simulated kernel, loads the module, creates its device node, and
//! plays the part of a user process reading passwords from it.

use crate::config::{ConfigError, SpgConfig};
use crate::generator::BUFFER_SIZE;
use crate::module::SpgModule;
use core_types::{FileId, MemoryPerms, ProcessId, UserAddr};
use kernel_api::{KernelError, OpenMode};
use klog::LogEntry;
use sim_kernel::{EntropyMode, SimulatedKernel};
use thiserror::Error;

/// Host runtime errors
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid host option: {0}")]
    InvalidOption(String),
}

/// Host runtime configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub module: SpgConfig,
    /// Seed for deterministic passwords; OS entropy when `None`
    pub seed: Option<u64>,
    /// Number of open/read/close cycles
    pub opens: usize,
    /// Bytes requested per read call
    pub chunk: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module: SpgConfig::default(),
            seed: None,
            opens: 1,
            chunk: BUFFER_SIZE,
        }
    }
}

/// What a host run produced
#[derive(Debug, Clone)]
pub struct HostReport {
    /// One password per open, in order
    pub passwords: Vec<String>,
    /// Kernel log at the end of the run
    pub log: Vec<LogEntry>,
}

/// Runs the module through load, `opens` read cycles, and unload
pub fn run(config: &HostConfig) -> Result<HostReport, HostError> {
    if config.chunk == 0 {
        return Err(HostError::InvalidOption("chunk must be positive".to_string()));
    }
    let dev = config.module.validate()?;
    let entropy = match config.seed {
        Some(seed) => EntropyMode::Seeded(seed),
        None => EntropyMode::Os,
    };
    let mut kernel = SimulatedKernel::with_entropy(entropy);

    let module = kernel.load_module::<SpgModule>(config.module.clone())?;
    let path = config.module.node_path();
    kernel.mknod(&path, dev)?;

    let pid = kernel.spawn_process();
    let buf = kernel.map(pid, config.chunk as u64, MemoryPerms::read_write())?;

    let mut passwords = Vec::with_capacity(config.opens);
    for _ in 0..config.opens {
        let file = kernel.open(pid, &path, OpenMode::ReadOnly)?;
        let password = drain(&mut kernel, pid, file, buf, config.chunk)?;
        kernel.close(file)?;
        passwords.push(String::from_utf8_lossy(&password).into_owned());
    }

    kernel.exit_process(pid)?;
    kernel.unlink(&path)?;
    kernel.unload_module(module);

    let log = kernel.log_mut().drain();
    Ok(HostReport { passwords, log })
}

/// Reads `file` in `chunk`-byte calls through `buf` until end of data
///
/// Every byte the driver reports as copied must be readable back from
/// `buf`; otherwise the read counts as a fault.
fn drain(
    kernel: &mut SimulatedKernel,
    pid: ProcessId,
    file: FileId,
    buf: UserAddr,
    chunk: usize,
) -> Result<Vec<u8>, KernelError> {
    let mut password = Vec::new();
    loop {
        let n = kernel.read(file, buf, chunk)?;
        if n == 0 {
            return Ok(password);
        }
        let bytes = kernel.peek(pid, buf, n).ok_or(KernelError::Fault)?;
        password.extend_from_slice(bytes);
    }
}
