//! Query and update sessions with an ESCape32 device.
//!
//! A session owns the transport for the whole run. Every command is followed
//! by a blocking receive before the next one is issued, and every reply is
//! checked through the session's [`MismatchPolicy`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use escape32::{Image, RunConfig, Session, Target};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::default();
//!     let image = Image::load("escape32.bin", Target::Firmware)?;
//!
//!     let mut session = Session::open(&config)?;
//!     session.probe()?;
//!     session.update(&image, |percent| println!("{percent:4}%"))?;
//!     session.close()?;
//!
//!     Ok(())
//! }
//! ```

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::image::{Image, Target};
use crate::info::{BOOTLOADER_INFO_LEN, BootloaderInfo, DeviceInfo, FIRMWARE_INFO_LEN, FirmwareInfo};
use crate::policy::{self, MismatchPolicy};
use crate::port::Port;
use crate::protocol::{Command, Link, ResultCode, Transport, length_code};
use log::{debug, trace};

const CONNECT_FAILED: &str = "Connection failed";
const READ_FAILED: &str = "Error reading data";
const WRITE_FAILED: &str = "Error writing data";
const UPDATE_FAILED: &str = "Update failed";

/// Protocol session over a transport.
pub struct Session<T: Transport> {
    transport: T,
    policy: Box<dyn MismatchPolicy>,
}

impl<T: Transport> Session<T> {
    /// Create a session using the mismatch policy implied by `config.force`.
    pub fn new(transport: T, config: &RunConfig) -> Self {
        Self::with_policy(transport, policy::for_force(config.force))
    }

    /// Create a session with an explicit mismatch policy.
    pub fn with_policy(transport: T, policy: Box<dyn MismatchPolicy>) -> Self {
        Self { transport, policy }
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn send_command(&mut self, cmd: Command) -> Result<()> {
        trace!("Sending command {cmd:?}");
        self.transport.send_value(cmd.into())
    }

    fn expect_ack(&mut self, what: &'static str) -> Result<()> {
        let reply = self.transport.receive_value()?;
        self.policy.check(
            what,
            reply.map(u32::from),
            u32::from(u8::from(ResultCode::Ok)),
        )
    }

    /// Receive a fixed-length record, padded or cut to `len` when the
    /// policy lets a length mismatch through.
    fn receive_record(&mut self, len: usize) -> Result<Vec<u8>> {
        let reply = self.transport.receive_data(len)?;
        let received = reply
            .as_ref()
            .map(|data| u32::try_from(data.len()).unwrap_or(u32::MAX));
        self.policy
            .check(READ_FAILED, received, u32::try_from(len).unwrap_or(u32::MAX))?;

        let mut data = reply.unwrap_or_default();
        data.resize(len, 0);
        Ok(data)
    }

    /// Check the device is listening.
    pub fn probe(&mut self) -> Result<()> {
        debug!("Probing device");
        self.send_command(Command::Probe)?;
        self.expect_ack(CONNECT_FAILED)
    }

    /// Read the bootloader info record.
    pub fn query_bootloader_info(&mut self) -> Result<BootloaderInfo> {
        debug!("Fetching bootloader info");
        self.send_command(Command::Info)?;
        let record = self.receive_record(BOOTLOADER_INFO_LEN)?;
        BootloaderInfo::decode(&record)
    }

    /// Read the firmware info record from the start of the firmware region.
    ///
    /// Returns `None` when no firmware is installed.
    pub fn query_firmware_info(&mut self) -> Result<Option<FirmwareInfo>> {
        debug!("Fetching firmware info");
        self.send_command(Command::Read)?;
        self.transport.send_value(0)?; // First block
        self.transport.send_value(length_code(FIRMWARE_INFO_LEN)?)?;
        let record = self.receive_record(FIRMWARE_INFO_LEN)?;
        FirmwareInfo::decode(&record)
    }

    /// Read the bootloader and firmware info records.
    pub fn query_info(&mut self) -> Result<DeviceInfo> {
        let bootloader = self.query_bootloader_info()?;
        let firmware = self.query_firmware_info()?;
        Ok(DeviceInfo {
            bootloader,
            firmware,
        })
    }

    /// Write an image to the firmware region, block by block.
    ///
    /// `progress` receives the completed percentage before each block.
    pub fn update_firmware<F>(&mut self, image: &Image, mut progress: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        debug!("Updating firmware ({} bytes)", image.len());

        for block in image.blocks() {
            progress(block.offset * 100 / image.len());

            let index = u8::try_from(block.index).map_err(|_| Error::InvalidLength(image.len()))?;
            trace!("Writing block {index} ({} bytes)", block.data.len());

            self.send_command(Command::Write)?;
            self.transport.send_value(index)?;
            self.transport.send_data(block.data)?;
            self.expect_ack(WRITE_FAILED)?;
        }

        Ok(())
    }

    /// Replace the bootloader.
    ///
    /// The device reboots after the last block and acknowledges once more
    /// when it is back up.
    pub fn update_bootloader<F>(&mut self, image: &Image, mut progress: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        debug!("Updating bootloader ({} bytes)", image.len());
        self.send_command(Command::Update)?;

        for block in image.blocks() {
            progress(block.offset * 100 / image.len());
            trace!("Sending block at {:#06x} ({} bytes)", block.offset, block.data.len());

            self.transport.send_data(block.data)?;
            self.expect_ack(WRITE_FAILED)?;
        }

        debug!("Waiting for device to reboot");
        self.expect_ack(UPDATE_FAILED)
    }

    /// Write an image to the region it was loaded for.
    pub fn update<F>(&mut self, image: &Image, progress: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        match image.target() {
            Target::Firmware => self.update_firmware(image, progress),
            Target::Bootloader => self.update_bootloader(image, progress),
        }
    }
}

impl<P: Port> Session<Link<P>> {
    /// Build a session over an opened port, discarding any stale input.
    pub fn from_port(mut port: P, config: &RunConfig) -> Result<Self> {
        port.clear_buffers().map_err(|e| Error::Connection {
            port: port.name().to_string(),
            source: Box::new(e),
        })?;
        debug!("Connected to {}", port.name());

        Ok(Self::new(Link::new(port), config))
    }

    /// Release the serial device.
    pub fn close(mut self) -> Result<()> {
        self.transport.close()
    }
}

// Native-specific convenience functions
#[cfg(feature = "native")]
mod native_impl {
    use super::{Error, Result, RunConfig, Session};
    use crate::port::NativePort;
    use crate::protocol::Link;

    impl Session<Link<NativePort>> {
        /// Open the serial device described by `config`.
        pub fn open(config: &RunConfig) -> Result<Self> {
            let port =
                NativePort::open(&config.serial_config()).map_err(|e| Error::Connection {
                    port: config.device.clone(),
                    source: Box::new(e),
                })?;
            Self::from_port(port, config)
        }
    }
}
