//! ESCape32 serial protocol.
//!
//! The host drives every exchange: it sends a command value, any arguments,
//! optionally a data frame, then waits for the device's reply before issuing
//! the next command.
//!
//! | Command | Host sends                        | Device replies        |
//! |---------|-----------------------------------|-----------------------|
//! | Probe   | -                                 | result                |
//! | Info    | -                                 | 32-byte data frame    |
//! | Read    | block, length code                | data frame            |
//! | Write   | block, data frame                 | result                |
//! | Update  | data frames, one per block        | result per block, then one after reboot |

pub mod link;

use crate::error::{Error, Result};

pub use link::Link;

/// Largest payload carried by one data frame.
pub const MAX_FRAME_LEN: usize = 1024;

/// Command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Check the device is listening.
    Probe = 0,
    /// Fetch the bootloader info record.
    Info = 1,
    /// Read a block of the firmware region.
    Read = 2,
    /// Write a block of the firmware region.
    Write = 3,
    /// Replace the bootloader.
    Update = 4,
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> Self {
        cmd as u8
    }
}

/// Result codes sent by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultCode {
    /// Success.
    Ok = 0,
    /// Failure.
    Error = 1,
}

impl From<ResultCode> for u8 {
    fn from(code: ResultCode) -> Self {
        code as u8
    }
}

/// Length code for a data frame: the number of 32-bit words minus one.
pub fn length_code(len: usize) -> Result<u8> {
    if len == 0 || len % 4 != 0 || len > MAX_FRAME_LEN {
        return Err(Error::InvalidLength(len));
    }
    u8::try_from(len / 4 - 1).map_err(|_| Error::InvalidLength(len))
}

/// Payload length announced by a length code.
pub fn frame_len(code: u8) -> usize {
    (usize::from(code) + 1) * 4
}

/// Value-level transport the protocol engine talks through.
///
/// Implementations frame values and buffers on the wire. A reply whose
/// framing fails its integrity check is returned as `Ok(None)`; I/O failures
/// are returned as errors.
pub trait Transport {
    /// Send one value.
    fn send_value(&mut self, value: u8) -> Result<()>;

    /// Receive one value.
    fn receive_value(&mut self) -> Result<Option<u8>>;

    /// Send a buffer as one data frame.
    fn send_data(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one data frame. `expected_len` is the length the protocol
    /// calls for; the returned buffer has whatever length the device sent.
    fn receive_data(&mut self, expected_len: usize) -> Result<Option<Vec<u8>>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_value(&mut self, value: u8) -> Result<()> {
        (**self).send_value(value)
    }

    fn receive_value(&mut self) -> Result<Option<u8>> {
        (**self).receive_value()
    }

    fn send_data(&mut self, data: &[u8]) -> Result<()> {
        (**self).send_data(data)
    }

    fn receive_data(&mut self, expected_len: usize) -> Result<Option<Vec<u8>>> {
        (**self).receive_data(expected_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(u8::from(Command::Probe), 0);
        assert_eq!(u8::from(Command::Info), 1);
        assert_eq!(u8::from(Command::Read), 2);
        assert_eq!(u8::from(Command::Write), 3);
        assert_eq!(u8::from(Command::Update), 4);
        assert_eq!(u8::from(ResultCode::Ok), 0);
        assert_eq!(u8::from(ResultCode::Error), 1);
    }

    #[test]
    fn test_length_code() {
        assert_eq!(length_code(4).unwrap(), 0);
        assert_eq!(length_code(20).unwrap(), 4);
        assert_eq!(length_code(32).unwrap(), 7);
        assert_eq!(length_code(1024).unwrap(), 255);
        assert_eq!(frame_len(4), 20);
        assert_eq!(frame_len(255), 1024);
    }

    #[test]
    fn test_length_code_rejects_unframeable_lengths() {
        for len in [0, 3, 6, 1025, 1028, 2048] {
            assert!(matches!(length_code(len), Err(Error::InvalidLength(l)) if l == len));
        }
    }
}
