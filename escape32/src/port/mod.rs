//! Port abstraction for serial communication.
//!
//! The protocol layer only needs a `Read + Write` byte stream; the `Port`
//! trait adds the handful of serial-specific operations the session uses
//! around it (buffer flushing, naming, release). Line settings are fixed
//! by [`SerialConfig`] when the port is opened.
//!
//! ```text
//! +------------------+
//! |  Session (engine)|
//! +--------+---------+
//!          |
//!          v
//! +--------+---------+
//! |   Link (framing) |
//! +--------+---------+
//!          |
//!          v
//! +--------+---------+
//! |   Port Trait     |
//! +--------+---------+
//!          |
//!          v
//! +--------+---------+
//! | Native SerialPort|
//! |   (serialport)   |
//! +------------------+
//! ```

#[cfg(feature = "native")]
pub mod native;

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Default baud rate of the ESCape32 serial interface.
pub const DEFAULT_BAUD: u32 = 38400;

/// Default read/write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Serial port configuration.
///
/// The line is always 8 data bits, no parity, one stop bit, no flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyUSB0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read/write timeout.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SerialConfig {
    /// Create a new configuration with port name and baud rate.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Serial port used by a session.
pub trait Port: Read + Write + Send {
    /// Discard pending input and output.
    fn clear_buffers(&mut self) -> Result<()>;

    /// Get the port name/path.
    fn name(&self) -> &str;

    /// Close the port and release resources.
    ///
    /// After calling this method, the port cannot be used for further I/O.
    fn close(&mut self) -> Result<()>;
}

#[cfg(feature = "native")]
pub use native::NativePort;
