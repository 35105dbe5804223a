//! File operations dispatched into drivers
//!
//! A character device driver implements [`FileOperations`]. The kernel calls
//! it for every open, read, write, seek, ioctl and close issued against a node
//! carrying the driver's device number. Operations a driver leaves out fall
//! back to the defaults here, which report [`KernelError::NotSupported`].

use crate::KernelError;
use core_types::{DeviceNumber, FileId, ProcessId};
use serde::{Deserialize, Serialize};

/// Access mode requested at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl OpenMode {
    pub fn readable(&self) -> bool {
        matches!(self, OpenMode::ReadOnly | OpenMode::ReadWrite)
    }

    pub fn writable(&self) -> bool {
        matches!(self, OpenMode::WriteOnly | OpenMode::ReadWrite)
    }
}

/// Seek origin for [`FileOperations::llseek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u64),
    Current(i64),
    End(i64),
}

/// Per-open context handed to the driver on every call
///
/// The kernel owns the context; drivers only observe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    /// The open file this call belongs to
    pub file_id: FileId,
    /// The process that opened the file
    pub process: ProcessId,
    /// Device number of the node that was opened
    pub device: DeviceNumber,
    /// Access mode requested at open
    pub mode: OpenMode,
}

/// Destination of a read in user memory (`copy_to_user`)
///
/// The writer covers exactly the region the caller passed to `read`. Each
/// successful write advances it; a failed write copies nothing.
pub trait UserWriter {
    /// Bytes still writable
    fn len(&self) -> usize;

    /// True once nothing more can be written
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `data` into user memory at the current position
    ///
    /// # Errors
    /// Returns `KernelError::Fault` if any byte of the destination is not
    /// mapped writable, or if `data` is longer than [`UserWriter::len`].
    fn write_slice(&mut self, data: &[u8]) -> Result<(), KernelError>;
}

/// The capability set of a character device driver
///
/// # Example
///
/// ```
/// use kernel_api::{FileContext, FileOperations, KernelError, UserWriter};
///
/// struct Zero;
///
/// impl FileOperations for Zero {
///     fn read(
///         &mut self,
///         _file: &FileContext,
///         writer: &mut dyn UserWriter,
///         _offset: &mut u64,
///     ) -> Result<usize, KernelError> {
///         let zeros = vec![0u8; writer.len()];
///         writer.write_slice(&zeros)?;
///         Ok(zeros.len())
///     }
/// }
/// ```
pub trait FileOperations {
    /// Called once per successful open, before any other call on the file
    fn open(&mut self, _file: &FileContext) -> Result<(), KernelError> {
        Ok(())
    }

    /// Copies up to `writer.len()` bytes to user memory
    ///
    /// `offset` is the kernel-owned file position. The driver advances it by
    /// the number of bytes it returns. Zero means end of data.
    fn read(
        &mut self,
        _file: &FileContext,
        _writer: &mut dyn UserWriter,
        _offset: &mut u64,
    ) -> Result<usize, KernelError> {
        Err(KernelError::NotSupported)
    }

    /// Consumes bytes written by a process
    fn write(
        &mut self,
        _file: &FileContext,
        _data: &[u8],
        _offset: &mut u64,
    ) -> Result<usize, KernelError> {
        Err(KernelError::NotSupported)
    }

    /// Repositions the file offset, returning the new position
    fn llseek(
        &mut self,
        _file: &FileContext,
        _pos: SeekFrom,
        _offset: &mut u64,
    ) -> Result<u64, KernelError> {
        Err(KernelError::NotSupported)
    }

    /// Device-specific control request
    fn ioctl(&mut self, _file: &FileContext, _cmd: u32, _arg: u64) -> Result<i64, KernelError> {
        Err(KernelError::NotSupported)
    }

    /// Called once when the last reference to the open file is closed
    fn release(&mut self, _file: &FileContext) {}
}
