//! Device info
//!
//! Payload of the get-device-info response (3 bytes):
//! - 1 byte: protocol version
//! - 2 bytes: feature bitmask (little-endian)

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol revision reported by the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// RCSplit firmware 1.1.0 and older
    RcSplit,
    /// RunCam Device Protocol 1.0
    V1_0,
    /// Anything newer or unrecognised
    Unknown(u8),
}

impl ProtocolVersion {
    /// Decode the version byte
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => ProtocolVersion::RcSplit,
            0x01 => ProtocolVersion::V1_0,
            other => ProtocolVersion::Unknown(other),
        }
    }

    /// Version byte as sent on the wire
    pub fn byte(&self) -> u8 {
        match self {
            ProtocolVersion::RcSplit => 0x00,
            ProtocolVersion::V1_0 => 0x01,
            ProtocolVersion::Unknown(b) => *b,
        }
    }
}

/// Feature bitmask advertised by the camera
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(u16);

impl Features {
    /// Power button can be simulated
    pub const SIMULATE_POWER_BUTTON: Features = Features(1 << 0);
    /// Wifi button can be simulated
    pub const SIMULATE_WIFI_BUTTON: Features = Features(1 << 1);
    /// Mode can be changed
    pub const CHANGE_MODE: Features = Features(1 << 2);
    /// 5-key OSD cable can be simulated
    pub const SIMULATE_5_KEY_OSD_CABLE: Features = Features(1 << 3);
    /// Recording can be started
    pub const START_RECORDING: Features = Features(1 << 6);
    /// Recording can be stopped
    pub const STOP_RECORDING: Features = Features(1 << 7);
    /// Camera menu is reachable through the FC
    pub const CMS_MENU: Features = Features(1 << 8);
    /// Camera requests FC attitude
    pub const FC_ATTITUDE: Features = Features(1 << 9);

    const NAMES: [(Features, &'static str); 8] = [
        (Self::SIMULATE_POWER_BUTTON, "SIMULATE_POWER_BUTTON"),
        (Self::SIMULATE_WIFI_BUTTON, "SIMULATE_WIFI_BUTTON"),
        (Self::CHANGE_MODE, "CHANGE_MODE"),
        (Self::SIMULATE_5_KEY_OSD_CABLE, "SIMULATE_5_KEY_OSD_CABLE"),
        (Self::START_RECORDING, "START_RECORDING"),
        (Self::STOP_RECORDING, "STOP_RECORDING"),
        (Self::CMS_MENU, "CMS_MENU"),
        (Self::FC_ATTITUDE, "FC_ATTITUDE"),
    ];

    /// Wrap a raw bitmask; unknown bits are kept
    pub const fn from_bits(bits: u16) -> Self {
        Features(bits)
    }

    /// Raw bitmask
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// True if every flag in `other` is set
    pub const fn contains(&self, other: Features) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Features {
    type Output = Features;

    fn bitor(self, rhs: Features) -> Features {
        Features(self.0 | rhs.0)
    }
}

impl fmt::Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Features({:#06x}: {})", self.0, names.join(" | "))
    }
}

/// Protocol version and feature set of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Protocol revision
    pub protocol_version: ProtocolVersion,
    /// Advertised features
    pub features: Features,
}

impl DeviceInfo {
    /// Decode a device-info payload; `None` if it is shorter than 3 bytes
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() < 3 {
            return None;
        }
        Some(Self {
            protocol_version: ProtocolVersion::from_byte(payload[0]),
            features: Features::from_bits(LittleEndian::read_u16(&payload[1..3])),
        })
    }

    /// Encode back into the 3-byte payload
    pub fn to_payload(&self) -> [u8; 3] {
        let mut payload = [self.protocol_version.byte(), 0, 0];
        LittleEndian::write_u16(&mut payload[1..3], self.features.bits());
        payload
    }

    /// True if every flag in `feature` is advertised
    pub fn supports(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }
}
