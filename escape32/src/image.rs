//! Binary update images.
//!
//! An image is a raw binary read from disk into a buffer whose capacity
//! depends on the target region:
//!
//! | Target     | Capacity |
//! |------------|----------|
//! | Firmware   | 26624    |
//! | Bootloader | 4096     |
//!
//! An image is accepted only when `0 < length < capacity` and the length is
//! a multiple of 4. A file that fills the buffer completely is rejected: it
//! is indistinguishable from a larger file that got truncated.

use crate::error::{Error, Result};
use log::{debug, warn};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Maximum size of one transfer block.
pub const BLOCK_SIZE: usize = 1024;

/// Buffer capacity for firmware images.
pub const FIRMWARE_CAPACITY: usize = 26624;

/// Buffer capacity for bootloader images.
pub const BOOTLOADER_CAPACITY: usize = 4096;

/// Region of the ESC an image is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// Main firmware.
    #[default]
    Firmware,
    /// Bootloader.
    Bootloader,
}

impl Target {
    /// Image buffer capacity for this target.
    pub fn capacity(self) -> usize {
        match self {
            Self::Firmware => FIRMWARE_CAPACITY,
            Self::Bootloader => BOOTLOADER_CAPACITY,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firmware => f.write_str("firmware"),
            Self::Bootloader => f.write_str("bootloader"),
        }
    }
}

/// Size rule an image violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDefect {
    /// Nothing was read.
    Empty,
    /// The image fills the whole buffer and may have been truncated.
    FillsCapacity,
    /// The length is not a multiple of 4.
    Misaligned,
}

impl fmt::Display for ImageDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("is empty"),
            Self::FillsCapacity => f.write_str("fills the whole buffer"),
            Self::Misaligned => f.write_str("is not a multiple of 4"),
        }
    }
}

/// A validated update image.
#[derive(Debug, Clone)]
pub struct Image {
    data: Vec<u8>,
    target: Target,
}

impl Image {
    /// Load an image file for the given target.
    pub fn load<P: AsRef<Path>>(path: P, target: Target) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| Error::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        let data = read_bounded(&mut file, target.capacity()).map_err(|source| {
            Error::ImageRead {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        Self::from_bytes(data, target)
    }

    /// Read an image from any reader, taking at most `target.capacity()` bytes.
    pub fn from_reader<R: Read>(reader: &mut R, target: Target) -> Result<Self> {
        let data = read_bounded(reader, target.capacity())?;
        Self::from_bytes(data, target)
    }

    /// Validate an in-memory image.
    pub fn from_bytes(data: Vec<u8>, target: Target) -> Result<Self> {
        let length = data.len();
        let capacity = target.capacity();
        let defect = if length == 0 {
            Some(ImageDefect::Empty)
        } else if length >= capacity {
            Some(ImageDefect::FillsCapacity)
        } else if length % 4 != 0 {
            Some(ImageDefect::Misaligned)
        } else {
            None
        };

        match defect {
            Some(defect) => Err(Error::InvalidImage {
                length,
                capacity,
                defect,
            }),
            None => Ok(Self { data, target }),
        }
    }

    /// Image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false` for a validated image.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Target region.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Buffer capacity of the target.
    pub fn capacity(&self) -> usize {
        self.target.capacity()
    }

    /// Transfer blocks in increasing offset order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            data: &self.data,
            offset: 0,
        }
    }
}

/// Read up to `capacity` bytes.
///
/// An error before the first byte is returned as is. An error after some
/// data arrived ends the read with what was collected so far.
fn read_bounded<R: Read>(reader: &mut R, capacity: usize) -> std::io::Result<Vec<u8>> {
    let mut data = vec![0u8; capacity];
    let mut length = 0;

    while length < capacity {
        match reader.read(&mut data[length..]) {
            Ok(0) => break,
            Ok(n) => length += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {},
            Err(e) if length == 0 => return Err(e),
            Err(e) => {
                warn!("Read stopped after {length} bytes: {e}");
                break;
            },
        }
    }

    data.truncate(length);
    Ok(data)
}

/// One chunk of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// Sequential block number (`offset / BLOCK_SIZE`).
    pub index: usize,
    /// Byte offset within the image.
    pub offset: usize,
    /// Block contents, at most [`BLOCK_SIZE`] bytes.
    pub data: &'a [u8],
}

/// Iterator over the blocks of an image.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        let end = (self.offset + BLOCK_SIZE).min(self.data.len());
        let block = Block {
            index: self.offset / BLOCK_SIZE,
            offset: self.offset,
            data: &self.data[self.offset..end],
        };
        self.offset = end;
        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.data.len() - self.offset).div_ceil(BLOCK_SIZE);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Blocks<'_> {}
