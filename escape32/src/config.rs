//! Run configuration.

use crate::image::Target;
use crate::port::{DEFAULT_BAUD, DEFAULT_TIMEOUT, SerialConfig};
use std::time::Duration;

/// Default serial device.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Settings for one run, fixed before the device is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Serial device path.
    pub device: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Serial read/write timeout.
    pub timeout: Duration,
    /// Region updated by this run.
    pub target: Target,
    /// Tolerate protocol mismatches.
    pub force: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
            target: Target::Firmware,
            force: false,
        }
    }
}

impl RunConfig {
    /// Serial settings for opening the device.
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig::new(self.device.clone(), self.baud_rate).with_timeout(self.timeout)
    }
}
