//! Frame encoding/decoding
//!
//! Request frame:
//! - 1 byte: header (0xCC)
//! - 1 byte: command id
//! - N bytes: payload
//! - 1 byte: CRC8 of everything above
//!
//! Fixed-length response frame (total length known per command):
//! - 1 byte: header
//! - total - 2 bytes: payload
//! - 1 byte: CRC8
//!
//! Variable-length response frame:
//! - 1 byte: header
//! - 1 byte: remaining chunk count
//! - 1 byte: payload length (setting type byte not included)
//! - 1 byte: setting type
//! - N bytes: payload
//! - 1 byte: CRC8

use std::time::Duration;

use tracing::trace;

use super::{crc, Command, ProtocolError, Transport, MAX_DATA_SIZE, PROTOCOL_HEADER};

/// Build a request frame for `command_id` carrying `payload`
pub fn encode_command(command_id: u8, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_DATA_SIZE {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(2 + payload.len() + 1);
    frame.push(PROTOCOL_HEADER);
    frame.push(command_id);
    frame.extend_from_slice(payload);
    frame.push(crc::crc8_dvb_s2(&frame));
    Ok(frame)
}

/// Decode a request frame back into its command id and payload
pub fn decode_command(frame: &[u8]) -> Result<(u8, Vec<u8>), ProtocolError> {
    if frame.len() < 3 {
        return Err(ProtocolError::TruncatedFrame(frame.len()));
    }
    check_frame(frame)?;
    Ok((frame[1], frame[2..frame.len() - 1].to_vec()))
}

/// Encode and transmit a request frame. No response is read.
pub fn send_command<T: Transport + ?Sized>(
    transport: &mut T,
    command_id: u8,
    payload: &[u8],
    timeout: Duration,
) -> Result<usize, ProtocolError> {
    let frame = encode_command(command_id, payload)?;
    trace!(bytes = ?frame, "sending frame");
    transport.transmit(&frame, timeout)?;
    Ok(frame.len())
}

/// Read a fixed-length response of `total_len` bytes in one bounded read
pub fn receive_fixed<T: Transport + ?Sized>(
    transport: &mut T,
    total_len: usize,
    timeout: Duration,
) -> Result<ReceivedFrame, ProtocolError> {
    let mut buf = vec![0u8; total_len];
    transport.receive(&mut buf, timeout)?;
    trace!(bytes = ?buf, "received fixed frame");
    Ok(ReceivedFrame::from_fixed(buf))
}

/// Read a variable-length response.
///
/// The length field has to be read before the payload read can be bounded,
/// so the frame is pulled in pieces and reassembled before the CRC check.
pub fn receive_variable<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
    byte_timeout: Duration,
) -> Result<ReceivedFrame, ProtocolError> {
    let header = read_byte(transport, timeout)?;
    let remaining_chunks = read_byte(transport, byte_timeout)?;
    let data_len = read_byte(transport, byte_timeout)?;
    let setting_type = read_byte(transport, byte_timeout)?;

    let mut payload = vec![0u8; data_len as usize];
    if !payload.is_empty() {
        transport.receive(&mut payload, timeout)?;
    }

    let crc = read_byte(transport, byte_timeout)?;

    let mut frame = Vec::with_capacity(4 + payload.len() + 1);
    frame.extend_from_slice(&[header, remaining_chunks, data_len, setting_type]);
    frame.extend_from_slice(&payload);
    frame.push(crc);
    trace!(bytes = ?frame, "received variable frame");

    Ok(ReceivedFrame::from_variable(frame))
}

fn read_byte<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
) -> Result<u8, ProtocolError> {
    let mut byte = [0u8; 1];
    transport.receive(&mut byte, timeout)?;
    Ok(byte[0])
}

/// Header and CRC check shared by every frame shape
fn check_frame(frame: &[u8]) -> Result<(), ProtocolError> {
    let Some((&actual, body)) = frame.split_last() else {
        return Err(ProtocolError::TruncatedFrame(0));
    };
    let expected = crc::crc8_dvb_s2(body);
    if expected != actual {
        return Err(ProtocolError::CrcMismatch { expected, actual });
    }
    if frame[0] != PROTOCOL_HEADER {
        return Err(ProtocolError::InvalidHeader(frame[0]));
    }
    Ok(())
}

/// A response frame read from the camera.
///
/// The payload is only kept when the frame passed its header and CRC checks;
/// an invalid frame exposes its envelope but never its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// First byte of the frame
    pub header: u8,
    /// Chunks still to come (variable-length frames only)
    pub remaining_chunks: Option<u8>,
    /// Setting type byte (variable-length frames only)
    pub setting_type: Option<u8>,
    /// Declared or derived payload length
    pub data_len: usize,
    /// Trailing CRC byte as received
    pub crc: u8,
    payload: Option<Vec<u8>>,
    error: Option<FrameError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameError {
    Truncated(usize),
    Header(u8),
    Crc { expected: u8, actual: u8 },
}

impl ReceivedFrame {
    /// Split a complete fixed-length frame
    pub fn from_fixed(buf: Vec<u8>) -> Self {
        let total = buf.len();
        let header = buf.first().copied().unwrap_or(0);
        let crc = buf.last().copied().unwrap_or(0);
        let data_len = total.saturating_sub(2);

        let error = if total < 2 {
            Some(FrameError::Truncated(total))
        } else {
            frame_error(&buf)
        };
        let payload = match error {
            None => Some(buf[1..total - 1].to_vec()),
            Some(_) => None,
        };

        Self {
            header,
            remaining_chunks: None,
            setting_type: None,
            data_len,
            crc,
            payload,
            error,
        }
    }

    /// Split a complete variable-length frame
    pub fn from_variable(buf: Vec<u8>) -> Self {
        if buf.len() < 5 {
            return Self {
                header: buf.first().copied().unwrap_or(0),
                remaining_chunks: None,
                setting_type: None,
                data_len: 0,
                crc: buf.last().copied().unwrap_or(0),
                payload: None,
                error: Some(FrameError::Truncated(buf.len())),
            };
        }

        let total = buf.len();
        let data_len = buf[2] as usize;
        let error = if 4 + data_len + 1 != total {
            Some(FrameError::Truncated(total))
        } else {
            frame_error(&buf)
        };
        let payload = match error {
            None => Some(buf[4..total - 1].to_vec()),
            Some(_) => None,
        };

        Self {
            header: buf[0],
            remaining_chunks: Some(buf[1]),
            setting_type: Some(buf[3]),
            data_len,
            crc: buf[total - 1],
            payload,
            error,
        }
    }

    /// Whether the frame passed its integrity checks
    pub fn is_valid(&self) -> bool {
        self.payload.is_some()
    }

    /// Payload bytes, if the frame is valid
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Take ownership of the payload, if the frame is valid
    pub fn into_payload(self) -> Option<Vec<u8>> {
        self.payload
    }

    /// Keep the frame if it is valid, otherwise return why it was rejected
    pub fn validated(self) -> Result<Self, ProtocolError> {
        let error = self.error;
        match error {
            None if self.payload.is_some() => Ok(self),
            Some(FrameError::Header(h)) => Err(ProtocolError::InvalidHeader(h)),
            Some(FrameError::Crc { expected, actual }) => {
                Err(ProtocolError::CrcMismatch { expected, actual })
            }
            Some(FrameError::Truncated(n)) => Err(ProtocolError::TruncatedFrame(n)),
            None => Err(ProtocolError::TruncatedFrame(self.data_len)),
        }
    }

    /// Turn the frame into its payload or the reason it was rejected
    pub fn into_result(self) -> Result<Vec<u8>, ProtocolError> {
        let data_len = self.data_len;
        self.validated()?
            .payload
            .ok_or(ProtocolError::TruncatedFrame(data_len))
    }
}

fn frame_error(buf: &[u8]) -> Option<FrameError> {
    match check_frame(buf) {
        Ok(()) => None,
        Err(ProtocolError::InvalidHeader(h)) => Some(FrameError::Header(h)),
        Err(ProtocolError::CrcMismatch { expected, actual }) => {
            Some(FrameError::Crc { expected, actual })
        }
        Err(_) => Some(FrameError::Truncated(buf.len())),
    }
}

/// How a command's response is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameShape {
    /// Fixed total length in bytes, header and CRC included
    Fixed(usize),
    /// Length-prefixed
    Variable,
}

/// Total response lengths of the fixed-length commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLengths {
    entries: Vec<(Command, usize)>,
}

impl ResponseLengths {
    /// Build a table from explicit entries
    pub fn new(entries: impl IntoIterator<Item = (Command, usize)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Total response length for `command`, if it is a fixed-length command
    pub fn lookup(&self, command: Command) -> Option<usize> {
        self.entries
            .iter()
            .find(|(cmd, _)| *cmd == command)
            .map(|(_, len)| *len)
    }

    /// Decode strategy for `command`; anything not in the table is variable
    pub fn shape(&self, command: Command) -> FrameShape {
        match self.lookup(command) {
            Some(len) => FrameShape::Fixed(len),
            None => FrameShape::Variable,
        }
    }
}

impl Default for ResponseLengths {
    fn default() -> Self {
        Self::new([
            (Command::GetDeviceInfo, 5),
            (Command::FiveKeyPress, 2),
            (Command::FiveKeyRelease, 2),
            (Command::FiveKeyConnection, 3),
        ])
    }
}
