//! Loadable module contract

use crate::{CharDeviceRegistry, KernelError, RandomSource};
use klog::LogEntry;

/// Kernel services available to a module during init and exit
pub trait ModuleHost: CharDeviceRegistry {
    /// Appends an entry to the kernel log (`printk`)
    fn printk(&mut self, entry: LogEntry);

    /// Hands out a handle to the kernel random source
    fn random_source(&mut self) -> Box<dyn RandomSource>;
}

/// A loadable kernel module
///
/// `init` builds the module's state and registers what it provides. The
/// returned value is the module: it lives until `exit` consumes it, so a
/// loaded module can not be re-initialised in place.
pub trait KernelModule: Sized {
    /// Module name, unique among loaded modules
    const NAME: &'static str;

    /// Load-time parameters
    type Params;

    /// Module entry point (`module_init`)
    fn init(host: &mut dyn ModuleHost, params: Self::Params) -> Result<Self, KernelError>;

    /// Module exit point (`module_exit`)
    fn exit(self, host: &mut dyn ModuleHost);
}
