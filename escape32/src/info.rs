//! Device info records.
//!
//! ## Bootloader info (32 bytes)
//!
//! ```text
//! +----------+----------------------+
//! | Revision |       Reserved       |
//! +----------+----------------------+
//! |    1     |          31          |
//! +----------+----------------------+
//! ```
//!
//! ## Firmware info (20 bytes, first words of the firmware region)
//!
//! ```text
//! +-----------+----------+-----+----------------+
//! | Magic(LE) | Revision | Pad |      Name      |
//! +-----------+----------+-----+----------------+
//! |     2     |    1     |  1  |       16       |
//! +-----------+----------+-----+----------------+
//! ```

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Length of the bootloader info record.
pub const BOOTLOADER_INFO_LEN: usize = 32;

/// Length of the firmware info record.
pub const FIRMWARE_INFO_LEN: usize = 20;

/// Magic marking an installed firmware.
pub const FIRMWARE_MAGIC: u16 = 0x32ea;

const NAME_OFFSET: usize = 4;
const NAME_LEN: usize = 16;

/// Bootloader information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootloaderInfo {
    /// Bootloader revision.
    pub revision: u8,
}

impl BootloaderInfo {
    /// Decode a bootloader info record.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ensure_len("bootloader info", bytes, BOOTLOADER_INFO_LEN)?;
        Ok(Self { revision: bytes[0] })
    }
}

/// Installed firmware information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareInfo {
    /// Firmware revision.
    pub revision: u8,
    /// Firmware name.
    pub name: String,
}

impl FirmwareInfo {
    /// Decode a firmware info record.
    ///
    /// Returns `None` when the magic is absent (no firmware installed).
    pub fn decode(bytes: &[u8]) -> Result<Option<Self>> {
        ensure_len("firmware info", bytes, FIRMWARE_INFO_LEN)?;

        let mut cursor = Cursor::new(bytes);
        let magic = cursor.read_u16::<LittleEndian>()?;
        if magic != FIRMWARE_MAGIC {
            return Ok(None);
        }
        let revision = cursor.read_u8()?;

        let raw = &bytes[NAME_OFFSET..NAME_OFFSET + NAME_LEN];
        let raw = raw
            .iter()
            .position(|&b| b == 0)
            .map_or(raw, |end| &raw[..end]);

        Ok(Some(Self {
            revision,
            name: String::from_utf8_lossy(raw).into_owned(),
        }))
    }
}

/// Result of an info query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Bootloader record.
    pub bootloader: BootloaderInfo,
    /// Firmware record, `None` if no firmware is installed.
    pub firmware: Option<FirmwareInfo>,
}

fn ensure_len(record: &'static str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(Error::ShortRecord {
            record,
            length: bytes.len(),
            expected,
        });
    }
    Ok(())
}
