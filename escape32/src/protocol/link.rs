//! Byte-level framing of values and data buffers.
//!
//! ## Value frame
//!
//! ```text
//! +-------+--------+
//! | Value | ~Value |
//! +-------+--------+
//! |   1   |   1    |
//! +-------+--------+
//! ```
//!
//! ## Data frame
//!
//! ```text
//! +--------------------+-----------+--------------+
//! | Length code (value)|  Payload  | CRC-32 (LE)  |
//! +--------------------+-----------+--------------+
//! |         2          | 4..=1024  |      4       |
//! +--------------------+-----------+--------------+
//! ```
//!
//! The length code is the payload length in 32-bit words minus one. A data
//! frame whose length code is corrupt leaves the stream out of step and is
//! an I/O error; a payload failing its CRC is reported as no valid reply.

use crate::error::Result;
use crate::port::Port;
use crate::protocol::{Transport, frame_len, length_code};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;
use std::io::{self, Read, Write};

/// Framing link over a byte stream.
pub struct Link<P: Read + Write> {
    port: P,
}

impl<P: Read + Write> Link<P> {
    /// Wrap a byte stream.
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Get a reference to the underlying stream.
    pub fn port(&self) -> &P {
        &self.port
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        trace!("TX {} bytes: {:02X?}", frame.len(), &frame[..frame.len().min(8)]);
        self.port.write_all(frame)?;
        self.port.flush()?;
        Ok(())
    }
}

impl<P: Port> Link<P> {
    /// Close the underlying port.
    pub fn close(&mut self) -> Result<()> {
        self.port.close()
    }
}

fn value_frame(value: u8) -> [u8; 2] {
    [value, !value]
}

impl<P: Read + Write> Transport for Link<P> {
    fn send_value(&mut self, value: u8) -> Result<()> {
        self.write_frame(&value_frame(value))
    }

    fn receive_value(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 2];
        self.port.read_exact(&mut buf)?;
        trace!("RX value frame: {buf:02X?}");
        if buf[0] ^ buf[1] != 0xFF {
            return Ok(None);
        }
        Ok(Some(buf[0]))
    }

    fn send_data(&mut self, data: &[u8]) -> Result<()> {
        let code = length_code(data.len())?;

        let mut frame = Vec::with_capacity(2 + data.len() + 4);
        frame.extend_from_slice(&value_frame(code));
        frame.extend_from_slice(data);
        frame.write_u32::<LittleEndian>(crc32fast::hash(data))?;

        self.write_frame(&frame)
    }

    fn receive_data(&mut self, expected_len: usize) -> Result<Option<Vec<u8>>> {
        // Without a trusted length the rest of the frame cannot be skipped.
        let Some(code) = self.receive_value()? else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "corrupt data frame length",
            )
            .into());
        };
        let len = frame_len(code);
        trace!("RX data frame: {len} bytes (expecting {expected_len})");

        let mut data = vec![0u8; len];
        self.port.read_exact(&mut data)?;
        let crc = self.port.read_u32::<LittleEndian>()?;
        if crc != crc32fast::hash(&data) {
            trace!("RX data frame CRC mismatch");
            return Ok(None);
        }
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::policy::ForcePolicy;
    use crate::session::Session;
    use std::collections::VecDeque;

    /// Mock serial port with separate read/write buffers.
    struct MockSerial {
        read_buf: VecDeque<u8>,
        write_buf: Vec<u8>,
    }

    impl MockSerial {
        fn new(response: &[u8]) -> Self {
            Self {
                read_buf: response.iter().copied().collect(),
                write_buf: Vec::new(),
            }
        }
    }

    impl Read for MockSerial {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.read_buf.is_empty() {
                return Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "no data"));
            }
            let n = buf.len().min(self.read_buf.len());
            for b in buf.iter_mut().take(n) {
                *b = self.read_buf.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    impl Write for MockSerial {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.write_buf.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn data_frame(payload: &[u8]) -> Vec<u8> {
        let code = u8::try_from(payload.len() / 4 - 1).unwrap();
        let mut frame = vec![code, !code];
        frame.extend_from_slice(payload);
        frame.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
        frame
    }

    #[test]
    fn test_send_value_writes_complement() {
        let mut link = Link::new(MockSerial::new(&[]));
        link.send_value(3).unwrap();
        link.send_value(0).unwrap();
        assert_eq!(link.port().write_buf, vec![0x03, 0xFC, 0x00, 0xFF]);
    }

    #[test]
    fn test_receive_value() {
        let mut link = Link::new(MockSerial::new(&[0x01, 0xFE]));
        assert_eq!(link.receive_value().unwrap(), Some(1));
    }

    #[test]
    fn test_receive_value_corrupt_frame() {
        let mut link = Link::new(MockSerial::new(&[0x00, 0x00]));
        assert_eq!(link.receive_value().unwrap(), None);
    }

    #[test]
    fn test_receive_value_timeout_is_io_error() {
        let mut link = Link::new(MockSerial::new(&[0x00]));
        assert!(matches!(link.receive_value(), Err(Error::Io(_))));
    }

    #[test]
    fn test_send_data_frame_layout() {
        let payload = [0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80];
        let mut link = Link::new(MockSerial::new(&[]));
        link.send_data(&payload).unwrap();

        let written = &link.port().write_buf;
        assert_eq!(written.len(), 2 + payload.len() + 4);
        assert_eq!(&written[..2], &[0x01, 0xFE]);
        assert_eq!(&written[2..10], &payload);
        assert_eq!(
            &written[10..],
            &crc32fast::hash(&payload).to_le_bytes()
        );
    }

    #[test]
    fn test_send_data_full_block() {
        let payload = vec![0xA5; 1024];
        let mut link = Link::new(MockSerial::new(&[]));
        link.send_data(&payload).unwrap();
        assert_eq!(&link.port().write_buf[..2], &[0xFF, 0x00]);
    }

    #[test]
    fn test_send_data_refuses_unframeable_length() {
        let mut link = Link::new(MockSerial::new(&[]));
        assert!(matches!(
            link.send_data(&[1, 2, 3]),
            Err(Error::InvalidLength(3))
        ));
        assert!(link.send_data(&[]).is_err());
        assert!(link.send_data(&vec![0u8; 1028]).is_err());
        assert!(link.port().write_buf.is_empty());
    }

    #[test]
    fn test_receive_data() {
        let payload: Vec<u8> = (0u8..20).collect();
        let mut link = Link::new(MockSerial::new(&data_frame(&payload)));
        assert_eq!(link.receive_data(20).unwrap(), Some(payload));
    }

    #[test]
    fn test_receive_data_returns_announced_length() {
        let payload = [0x42u8; 12];
        let mut link = Link::new(MockSerial::new(&data_frame(&payload)));
        assert_eq!(link.receive_data(32).unwrap().unwrap().len(), 12);
    }

    #[test]
    fn test_receive_data_bad_crc() {
        let mut frame = data_frame(&[0x42u8; 32]);
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        let mut link = Link::new(MockSerial::new(&frame));
        assert_eq!(link.receive_data(32).unwrap(), None);
    }

    #[test]
    fn test_receive_data_bad_length_frame() {
        let mut link = Link::new(MockSerial::new(&[0x07, 0x07]));
        assert!(matches!(link.receive_data(32), Err(Error::Io(_))));
    }

    fn firmware_info_record() -> Vec<u8> {
        let mut rec = vec![0u8; 20];
        rec[..4].copy_from_slice(&[0xEA, 0x32, 0x07, 0x00]);
        rec[4..12].copy_from_slice(b"ESCape32");
        rec
    }

    #[test]
    fn test_forced_info_aborts_on_corrupt_length_code() {
        let mut stream = data_frame(&[0x05u8; 32]);
        stream[1] ^= 0x10;
        stream.extend(data_frame(&firmware_info_record()));

        let mut session =
            Session::with_policy(Link::new(MockSerial::new(&stream)), Box::new(ForcePolicy));
        assert!(matches!(session.query_info(), Err(Error::Io(_))));
    }

    #[test]
    fn test_forced_info_stays_in_step_after_bad_crc() {
        let mut stream = data_frame(&[0x05u8; 32]);
        let crc_byte = 2 + 32;
        stream[crc_byte] ^= 0x01;
        stream.extend(data_frame(&firmware_info_record()));

        let mut session =
            Session::with_policy(Link::new(MockSerial::new(&stream)), Box::new(ForcePolicy));
        let info = session.query_info().unwrap();
        assert_eq!(info.bootloader.revision, 0);
        let fw = info.firmware.unwrap();
        assert_eq!(fw.revision, 7);
        assert_eq!(fw.name, "ESCape32");
    }

    #[test]
    fn test_receive_data_truncated_payload_is_io_error() {
        let frame = data_frame(&[0x42u8; 32]);
        let mut link = Link::new(MockSerial::new(&frame[..20]));
        assert!(matches!(link.receive_data(32), Err(Error::Io(_))));
    }
}
