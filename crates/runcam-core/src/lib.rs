//! # RunCam Core Library
//!
//! Host-side client for the RunCam device protocol.
//!
//! This library provides:
//! - CRC8 (DVB-S2) frame integrity checking
//! - Request frame encoding and fixed/variable-length response decoding
//! - A bounded retry policy that hides transient link errors
//! - Device info, recording time and recording control operations
//! - A simulated camera for hardware-free testing
//!
//! ## Example
//!
//! ```rust,ignore
//! use runcam_core::{config::ConnectionConfig, protocol::Connection};
//!
//! let config = ConnectionConfig::load("camera.json")?;
//! let mut camera = Connection::open(config)?;
//!
//! let time = camera.query_recording_time()?;
//! println!("{} seconds of recording left", time.seconds);
//!
//! camera.toggle_recording()?;
//! assert!(camera.is_recording());
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod demo;
pub mod device;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ConnectionConfig;
    pub use crate::demo::DemoCamera;
    pub use crate::device::{DeviceInfo, Features, ProtocolVersion, RecordingTime, SettingDetail};
    pub use crate::protocol::{
        CameraOperation, Command, Connection, FiveKey, FiveKeyConnection, ProtocolError,
        SerialTransport, SettingId, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
