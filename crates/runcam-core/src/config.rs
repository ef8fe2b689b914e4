//! Connection configuration
//!
//! Stored as JSON. Every field has a default, so a config file only needs to
//! name what it changes (usually just the port).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::protocol::{
    ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_BYTE_TIMEOUT_MS, DEFAULT_RECEIVE_TIMEOUT_MS,
    DEFAULT_RETRIES, DEFAULT_SEND_TIMEOUT_MS,
};

/// Link and retry settings for one camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Send/receive attempts per query, at least 1
    pub retries: u8,
    /// Timeout for writing a request frame
    pub send_timeout_ms: u64,
    /// Timeout for a fixed response, or for the header and payload of a
    /// variable response
    pub receive_timeout_ms: u64,
    /// Timeout for each single-byte field of a variable response
    pub byte_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            retries: DEFAULT_RETRIES,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            byte_timeout_ms: DEFAULT_BYTE_TIMEOUT_MS,
        }
    }
}

impl ConnectionConfig {
    /// Default settings for the given port
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ProtocolError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProtocolError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Write the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProtocolError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.retries == 0 {
            return Err(ProtocolError::InvalidConfig(
                "retries must be at least 1".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(ProtocolError::InvalidConfig(
                "baud_rate must be non-zero".to_string(),
            ));
        }
        if self.send_timeout_ms == 0 || self.receive_timeout_ms == 0 || self.byte_timeout_ms == 0
        {
            return Err(ProtocolError::InvalidConfig(
                "timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Send timeout as a [`Duration`]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Receive timeout as a [`Duration`]
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Per-byte timeout as a [`Duration`]
    pub fn byte_timeout(&self) -> Duration {
        Duration::from_millis(self.byte_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.retries, 3);
        assert_eq!(config.send_timeout(), Duration::from_millis(10));
        assert_eq!(config.byte_timeout(), Duration::from_millis(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ConnectionConfig::from_json(r#"{"port_name": "/dev/ttyS1", "retries": 5}"#)
            .expect("valid config");
        assert_eq!(config.port_name, "/dev/ttyS1");
        assert_eq!(config.retries, 5);
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let err = ConnectionConfig::from_json(r#"{"retries": 0}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ConnectionConfig::for_port("COM3");
        config.byte_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = ConnectionConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ProtocolError::ConfigError(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("camera.json");

        let mut config = ConnectionConfig::for_port("/dev/ttyACM0");
        config.receive_timeout_ms = 25;
        config.save(&path).expect("save");

        let loaded = ConnectionConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConnectionConfig::load("/nonexistent/camera.json").unwrap_err();
        assert!(matches!(err, ProtocolError::ConfigError(_)));
    }
}
