//! Error types for escape32.

use crate::image::ImageDefect;
use crate::policy::Mismatch;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for escape32 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for escape32 operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the serial link.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The serial device could not be opened or configured.
    #[error("Cannot open {port}")]
    Connection {
        /// Device path.
        port: String,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// The device replied with an unexpected value or length.
    #[error("{0}")]
    Mismatch(Mismatch),

    /// The image file does not satisfy the size rules of its target.
    #[error("Invalid image: {length} bytes {defect} (capacity {capacity})")]
    InvalidImage {
        /// Number of bytes read.
        length: usize,
        /// Buffer capacity of the target.
        capacity: usize,
        /// Which rule was violated.
        defect: ImageDefect,
    },

    /// The image file could not be read.
    #[error("Cannot read image")]
    ImageRead {
        /// Image path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A device info record is shorter than its fixed layout.
    #[error("{record} record too short: {length} bytes, expected {expected}")]
    ShortRecord {
        /// Record name.
        record: &'static str,
        /// Bytes available.
        length: usize,
        /// Bytes required.
        expected: usize,
    },

    /// A data frame cannot carry a buffer of this length.
    #[error("Cannot frame {0} bytes (must be a multiple of 4 between 4 and 1024)")]
    InvalidLength(usize),
}

impl Error {
    /// Whether this error is a protocol mismatch (the only class force mode tolerates).
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch(_))
    }
}
