//! Device session handler
//!
//! [`SpgDevice`] is the driver the kernel dispatches into. Each open
//! generates a password; reads drain it sequentially from the kernel-owned
//! file offset until it is exhausted. Write, seek and ioctl keep the default
//! "operation not supported" behavior.

use crate::state::DeviceState;
use core_types::DeviceNumber;
use kernel_api::{FileContext, FileOperations, KernelError, UserWriter};

/// The `spg` character device driver
pub struct SpgDevice {
    dev: DeviceNumber,
    state: DeviceState,
}

impl SpgDevice {
    pub fn new(dev: DeviceNumber, state: DeviceState) -> Self {
        Self { dev, state }
    }

    pub fn device_number(&self) -> DeviceNumber {
        self.dev
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }
}

impl FileOperations for SpgDevice {
    fn open(&mut self, file: &FileContext) -> Result<(), KernelError> {
        self.state.regenerate(file.file_id)?;
        log::debug!(
            "spg: {} opened {} by {}",
            self.dev,
            file.file_id,
            file.process
        );
        Ok(())
    }

    fn read(
        &mut self,
        file: &FileContext,
        writer: &mut dyn UserWriter,
        offset: &mut u64,
    ) -> Result<usize, KernelError> {
        let password = self
            .state
            .password_for(file.file_id)
            .ok_or(KernelError::BadFile(file.file_id))?;

        let len = password.len() as u64;
        if *offset >= len {
            return Ok(0);
        }

        let start = *offset as usize;
        let bytes_to_copy = writer.len().min(password.len() - start);
        if bytes_to_copy == 0 {
            return Ok(0);
        }

        // On a fault the offset stays put so the caller can retry.
        writer.write_slice(&password[start..start + bytes_to_copy])?;
        *offset += bytes_to_copy as u64;
        Ok(bytes_to_copy)
    }

    fn release(&mut self, file: &FileContext) {
        self.state.release(file.file_id);
        log::trace!("spg: {} released {}", self.dev, file.file_id);
    }
}
