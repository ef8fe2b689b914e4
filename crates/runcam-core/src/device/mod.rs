//! Decoded device state
//!
//! Values produced from validated response payloads.

mod info;
mod settings;

pub use info::{DeviceInfo, Features, ProtocolVersion};
pub use settings::{parse_leading_int, RecordingTime, SettingDetail};
