//! # escape32
//!
//! A library for querying and updating ESCape32 motor controllers over a
//! serial link.
//!
//! This crate provides:
//!
//! - Image loading with per-target size validation
//! - Decoding of the bootloader and firmware info records
//! - Value and data framing for the ESCape32 serial protocol
//! - A protocol session driving probe, info and update sequences
//! - A mismatch policy deciding whether unexpected replies abort the run
//!
//! ## Features
//!
//! - `native` (default): Native serial port support via the `serialport` crate
//!
//! ## Example
//!
//! ```rust,no_run
//! use escape32::{RunConfig, Session};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig {
//!         device: "/dev/ttyUSB0".into(),
//!         ..Default::default()
//!     };
//!
//!     let mut session = Session::open(&config)?;
//!     session.probe()?;
//!
//!     let info = session.query_info()?;
//!     println!("Bootloader revision {}", info.bootloader.revision);
//!     if let Some(fw) = info.firmware {
//!         println!("Firmware revision {} [{}]", fw.revision, fw.name);
//!     }
//!
//!     session.close()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod image;
pub mod info;
pub mod policy;
pub mod port;
pub mod protocol;
pub mod session;

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::NativePort;
pub use {
    config::{DEFAULT_DEVICE, RunConfig},
    error::{Error, Result},
    image::{BLOCK_SIZE, Block, Image, ImageDefect, Target},
    info::{BootloaderInfo, DeviceInfo, FirmwareInfo},
    policy::{ForcePolicy, Mismatch, MismatchPolicy, StrictPolicy},
    port::{Port, SerialConfig},
    protocol::{Command, Link, ResultCode, Transport},
    session::Session,
};
