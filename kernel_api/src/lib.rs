//! # Kernel API
//!
//! This crate defines the interface between a loadable device module and
//! the kernel hosting it.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms**, the module provides **behavior**:
//! - Device-number regions and the character-device table belong to the kernel
//! - File offsets and the user address space belong to the kernel
//! - The module supplies a [`FileOperations`] implementation and nothing else
//!
//! ## Design Goals
//!
//! 1. **Testability**: Every kernel service a module touches is a trait
//! 2. **Explicit ownership**: Module state is an owned value, never a global
//! 3. **Typed failures**: Every error maps onto a kernel errno
//!
//! ## Non-Goals
//!
//! This is NOT a binding to a real kernel. It is the contract that a real
//! binding and the simulated kernel both satisfy.

pub mod chrdev;
pub mod error;
pub mod file;
pub mod module;
pub mod random;

pub use chrdev::CharDeviceRegistry;
pub use error::KernelError;
pub use file::{FileContext, FileOperations, OpenMode, SeekFrom, UserWriter};
pub use module::{KernelModule, ModuleHost};
pub use random::RandomSource;
