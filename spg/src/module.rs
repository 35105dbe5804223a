//! Lifecycle manager
//!
//! Load claims the device number and adds the character device. Unload
//! removes both. A failed load leaves nothing registered.

use crate::config::SpgConfig;
use crate::session::SpgDevice;
use crate::state::DeviceState;
use core_types::DeviceNumber;
use kernel_api::{KernelError, KernelModule, ModuleHost};
use klog::LogEntry;

/// The loaded spg module
///
/// Holds the device identity. The device state itself lives inside the
/// registered driver, owned by the kernel's character-device table.
#[derive(Debug)]
pub struct SpgModule {
    dev: DeviceNumber,
    name: String,
}

impl SpgModule {
    pub fn device_number(&self) -> DeviceNumber {
        self.dev
    }

    pub fn device_name(&self) -> &str {
        &self.name
    }
}

impl KernelModule for SpgModule {
    const NAME: &'static str = "spg";

    type Params = SpgConfig;

    fn init(host: &mut dyn ModuleHost, config: SpgConfig) -> Result<Self, KernelError> {
        let dev = config
            .validate()
            .map_err(|e| KernelError::InvalidArgument(e.to_string()))?;
        let state = DeviceState::new(
            host.random_source(),
            config.buffer_policy,
            config.scrub_on_release,
        );
        register(host, dev, &config.device_name, SpgDevice::new(dev, state))?;
        Ok(Self {
            dev,
            name: config.device_name,
        })
    }

    fn exit(self, host: &mut dyn ModuleHost) {
        unregister(host, self.dev, &self.name);
    }
}

/// Claims `dev` and makes `device` live on it
///
/// # Errors
/// Propagates the kernel's failure. If the character device can not be
/// added, the claimed number is released before returning.
pub fn register(
    host: &mut dyn ModuleHost,
    dev: DeviceNumber,
    name: &str,
    device: SpgDevice,
) -> Result<(), KernelError> {
    if let Err(err) = host.register_chrdev_region(dev, 1, name) {
        host.printk(
            LogEntry::alert("Failed to claim a device number.")
                .with_source(SpgModule::NAME)
                .with_field("device", dev)
                .with_field("errno", err.errno()),
        );
        return Err(err);
    }

    if let Err(err) = host.cdev_add(dev, 1, Box::new(device)) {
        host.unregister_chrdev_region(dev, 1);
        host.printk(
            LogEntry::alert("Failed to register a device.")
                .with_source(SpgModule::NAME)
                .with_field("device", dev)
                .with_field("errno", err.errno()),
        );
        return Err(err);
    }

    host.printk(
        LogEntry::info(format!(
            "Registered device: /dev/{}, Major number: {}",
            name,
            dev.major()
        ))
        .with_source(SpgModule::NAME)
        .with_field("major", dev.major())
        .with_field("minor", dev.minor()),
    );
    Ok(())
}

/// Removes the device registered at `dev` and releases the number
pub fn unregister(host: &mut dyn ModuleHost, dev: DeviceNumber, name: &str) {
    // Dropping the driver drops the device state with it.
    drop(host.cdev_del(dev));
    host.unregister_chrdev_region(dev, 1);
    host.printk(
        LogEntry::info(format!("Unregistered device: /dev/{}", name))
            .with_source(SpgModule::NAME)
            .with_field("major", dev.major())
            .with_field("minor", dev.minor()),
    );
}
