//! Device state
//!
//! One [`DeviceState`] exists per loaded module. It is built in module init,
//! moved into the registered driver, and dropped when the driver comes back
//! out of `cdev_del` at module exit.

use crate::generator::{self, PasswordBuffer, PASSWORD_LEN};
use core_types::FileId;
use kernel_api::{KernelError, RandomSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where each open session's password lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferPolicy {
    /// One buffer for the whole device
    ///
    /// Every open regenerates it. A reader still draining an earlier session
    /// sees the newer password from its current offset on.
    #[default]
    Shared,

    /// A private buffer per open file, dropped at close
    ///
    /// Concurrent readers never observe each other's passwords.
    PerSession,
}

/// State owned by the loaded module
pub struct DeviceState {
    shared: PasswordBuffer,
    sessions: HashMap<FileId, PasswordBuffer>,
    length: usize,
    policy: BufferPolicy,
    scrub_on_release: bool,
    rng: Box<dyn RandomSource>,
}

impl DeviceState {
    /// Creates state generating [`PASSWORD_LEN`]-character passwords
    pub fn new(rng: Box<dyn RandomSource>, policy: BufferPolicy, scrub_on_release: bool) -> Self {
        Self {
            shared: PasswordBuffer::new(),
            sessions: HashMap::new(),
            length: PASSWORD_LEN,
            policy,
            scrub_on_release,
            rng,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn policy(&self) -> BufferPolicy {
        self.policy
    }

    pub fn scrub_on_release(&self) -> bool {
        self.scrub_on_release
    }

    /// Generates the password `file` will read
    pub fn regenerate(&mut self, file: FileId) -> Result<(), KernelError> {
        match self.policy {
            BufferPolicy::Shared => generator::generate(&mut self.shared, self.length, &mut *self.rng),
            BufferPolicy::PerSession => {
                let buf = self.sessions.entry(file).or_default();
                generator::generate(buf, self.length, &mut *self.rng)
            }
        }
    }

    /// The password bytes `file` reads from
    ///
    /// `None` under [`BufferPolicy::PerSession`] when `file` has no session.
    pub fn password_for(&self, file: FileId) -> Option<&[u8]> {
        match self.policy {
            BufferPolicy::Shared => Some(self.shared.as_bytes()),
            BufferPolicy::PerSession => self.sessions.get(&file).map(PasswordBuffer::as_bytes),
        }
    }

    /// Ends the session for `file`
    pub fn release(&mut self, file: FileId) {
        match self.policy {
            BufferPolicy::Shared => {
                if self.scrub_on_release {
                    self.shared.scrub();
                }
            }
            BufferPolicy::PerSession => {
                if let Some(mut buf) = self.sessions.remove(&file) {
                    if self.scrub_on_release {
                        buf.scrub();
                    }
                }
            }
        }
    }

    /// The shared buffer, whatever the policy
    pub fn shared_buffer(&self) -> &PasswordBuffer {
        &self.shared
    }

    /// Number of live per-session buffers
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Zeroes the shared buffer and every live session buffer
    fn scrub_all(&mut self) {
        self.shared.scrub();
        self.sessions.values_mut().for_each(PasswordBuffer::scrub);
    }
}

impl Drop for DeviceState {
    fn drop(&mut self) {
        if self.scrub_on_release {
            self.scrub_all();
        }
    }
}
