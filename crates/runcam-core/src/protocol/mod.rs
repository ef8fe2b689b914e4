//! RunCam Device Protocol
//!
//! Implements the half-duplex request/response protocol spoken by RunCam
//! cameras over a UART link.
//!
//! Every frame starts with [`PROTOCOL_HEADER`] and ends with a CRC8 (DVB-S2)
//! computed over all preceding bytes. Responses come in two shapes: fixed
//! length (known per command) and variable length (self-describing).

pub mod commands;
mod connection;
pub mod crc;
mod error;
mod packet;
pub mod serial;
mod transport;

pub use commands::{CameraOperation, Command, FiveKey, FiveKeyConnection, SettingId, SettingType};
pub use connection::{Connection, LinkStats};
pub use error::ProtocolError;
pub use packet::{
    decode_command, encode_command, receive_fixed, receive_variable, send_command, FrameShape,
    ReceivedFrame, ResponseLengths,
};
pub use serial::{list_ports, open_port, PortInfo};
pub use transport::{SerialTransport, Transport};

/// First byte of every frame, in both directions
pub const PROTOCOL_HEADER: u8 = 0xCC;

/// Largest frame the camera will send or accept
pub const MAX_PACKET_SIZE: usize = 64;

/// Largest payload a request frame can carry (header and CRC excluded)
pub const MAX_DATA_SIZE: usize = 62;

/// Default baud rate for RunCam cameras
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default number of send/receive attempts per query
pub const DEFAULT_RETRIES: u8 = 3;

/// Default timeout for transmitting a frame in milliseconds
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 10;

/// Default timeout for the first byte(s) of a response in milliseconds
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 10;

/// Default timeout between the single-byte reads of a variable-length response
pub const DEFAULT_BYTE_TIMEOUT_MS: u64 = 1;
