//! Protocol errors

use thiserror::Error;

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The serial port reported a failure
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Nothing (or not enough) arrived in time
    #[error("Transport timeout")]
    Timeout,

    /// First byte of a response was not 0xCC
    #[error("Invalid frame header: expected 0xcc, got {0:#04x}")]
    InvalidHeader(u8),

    /// Frame shorter than its declared or minimum length
    #[error("Truncated frame: {0} bytes")]
    TruncatedFrame(usize),

    /// Trailer does not match the CRC of the frame body
    #[error("CRC mismatch: expected {expected:#04x}, got {actual:#04x}")]
    CrcMismatch {
        /// CRC computed over the received body
        expected: u8,
        /// CRC byte received
        actual: u8,
    },

    /// Every attempt of a query failed
    #[error("Communication failed: no valid response to command {command:#04x} after {attempts} attempts")]
    ExhaustedRetries {
        /// Command id
        command: u8,
        /// Attempts made
        attempts: u8,
    },

    /// The command is not in the fixed-length response table
    #[error("Command {0:#04x} has no fixed response length")]
    UnknownResponseLength(u8),

    /// A chunked setting did not end within 256 chunks
    #[error("Setting {setting:#04x} still reports {remaining} chunks after the last chunk index")]
    ChunkLimit {
        /// Setting id
        setting: u8,
        /// Chunks the camera still claimed to hold
        remaining: u8,
    },

    /// Request payload does not fit in one frame
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// Configuration values the engine cannot run with
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be read or parsed
    #[error("Failed to read configuration: {0}")]
    ConfigError(String),

    /// Serial port does not exist
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the retry loop should try again after this error.
    ///
    /// Link failures and integrity failures are treated the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProtocolError::SerialError(_)
                | ProtocolError::Timeout
                | ProtocolError::InvalidHeader(_)
                | ProtocolError::TruncatedFrame(_)
                | ProtocolError::CrcMismatch { .. }
                | ProtocolError::IoError(_)
        )
    }
}
