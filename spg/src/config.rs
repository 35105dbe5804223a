//! Module load parameters
//!
//! Parameters are fixed for the lifetime of a loaded module. The password
//! length is not among them: it is compiled in.

use crate::state::BufferPolicy;
use core_types::{DeviceNumber, DeviceNumberError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conventional major number of the device
pub const DEFAULT_MAJOR: u32 = 42;

/// Name the device registers under and appears as in `/dev`
pub const DEFAULT_DEVICE_NAME: &str = "spg";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Device name must be non-empty and contain no '/'")]
    InvalidName,

    #[error("Invalid device number: {0}")]
    DeviceNumber(#[from] DeviceNumberError),
}

/// Parameters for loading the spg module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpgConfig {
    pub device_name: String,
    pub major: u32,
    pub minor: u32,
    pub buffer_policy: BufferPolicy,
    /// Zero password buffers at close and at unload
    pub scrub_on_release: bool,
}

impl Default for SpgConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            major: DEFAULT_MAJOR,
            minor: 0,
            buffer_policy: BufferPolicy::Shared,
            scrub_on_release: false,
        }
    }
}

impl SpgConfig {
    /// Parses a JSON config, filling missing fields with defaults
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SpgConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the config and returns its device number
    pub fn validate(&self) -> Result<DeviceNumber, ConfigError> {
        if self.device_name.is_empty() || self.device_name.contains('/') {
            return Err(ConfigError::InvalidName);
        }
        Ok(DeviceNumber::new(self.major, self.minor)?)
    }

    /// Path of the device node, by convention
    pub fn node_path(&self) -> String {
        format!("/dev/{}", self.device_name)
    }
}
