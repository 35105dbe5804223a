//! # SPG: Strong Password Generator device
//!
//! A character device that generates a fresh random password on every open
//! and serves it to the opener through sequential reads.
//!
//! ## Lifecycle
//!
//! - **Load**: [`SpgModule`] claims device number 42:0 and adds the
//!   [`SpgDevice`] driver to the kernel's character-device table
//! - **Open**: the driver fills its password buffer with
//!   [`PASSWORD_LEN`] characters drawn from [`CHARSET`]
//! - **Read**: bytes are copied from the kernel-held file offset until the
//!   password is exhausted, then reads return 0
//! - **Unload**: the driver is removed and the number released
//!
//! ## Concurrency
//!
//! Under the default [`BufferPolicy::Shared`] every open rewrites the same
//! buffer, so two overlapping sessions can observe each other's password.
//! [`BufferPolicy::PerSession`] gives every open file its own buffer.

pub mod charset;
pub mod config;
pub mod generator;
pub mod host;
pub mod module;
pub mod session;
pub mod state;

pub use charset::CHARSET;
pub use config::{ConfigError, SpgConfig};
pub use generator::{generate, PasswordBuffer, BUFFER_SIZE, PASSWORD_LEN};
pub use host::{HostConfig, HostError, HostReport};
pub use module::SpgModule;
pub use session::SpgDevice;
pub use state::{BufferPolicy, DeviceState};
