//! Protocol commands
//!
//! Command ids and the sub-operation codes that travel in their payloads.

use serde::{Deserialize, Serialize};

/// Commands understood by RunCam devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Read protocol version and feature bitmask
    GetDeviceInfo,

    /// Simulate a camera button or start/stop recording
    CameraControl,

    /// Press a key of the simulated 5-key OSD cable
    FiveKeyPress,

    /// Release the key of the simulated 5-key OSD cable
    FiveKeyRelease,

    /// Open or close the 5-key OSD cable simulation
    FiveKeyConnection,

    /// Flight controller attitude request (sent by the camera)
    RequestFcAttitude,

    /// List the settings of a menu folder
    GetSettings,

    /// Read the value of one setting
    ReadSettingDetail,

    /// Write the value of one setting
    WriteSetting,
}

impl Command {
    /// Command id byte on the wire
    pub fn id(&self) -> u8 {
        match self {
            Command::GetDeviceInfo => 0x00,
            Command::CameraControl => 0x01,
            Command::FiveKeyPress => 0x02,
            Command::FiveKeyRelease => 0x03,
            Command::FiveKeyConnection => 0x04,
            Command::GetSettings => 0x10,
            Command::ReadSettingDetail => 0x11,
            Command::WriteSetting => 0x13,
            Command::RequestFcAttitude => 0x50,
        }
    }

    /// Look a command up by its id byte
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0x00 => Command::GetDeviceInfo,
            0x01 => Command::CameraControl,
            0x02 => Command::FiveKeyPress,
            0x03 => Command::FiveKeyRelease,
            0x04 => Command::FiveKeyConnection,
            0x10 => Command::GetSettings,
            0x11 => Command::ReadSettingDetail,
            0x13 => Command::WriteSetting,
            0x50 => Command::RequestFcAttitude,
            _ => return None,
        })
    }

    /// Check if the camera answers this command
    pub fn expects_response(&self) -> bool {
        !matches!(self, Command::CameraControl | Command::RequestFcAttitude)
    }
}

/// Camera-control sub-operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraOperation {
    /// Press the wifi button
    SimulateWifiButton,
    /// Press the power button
    SimulatePowerButton,
    /// Cycle the camera mode
    ChangeMode,
    /// Start recording
    StartRecording,
    /// Stop recording
    StopRecording,
}

impl CameraOperation {
    /// Sub-operation byte carried in the camera-control payload
    pub fn code(&self) -> u8 {
        match self {
            CameraOperation::SimulateWifiButton => 0x00,
            CameraOperation::SimulatePowerButton => 0x01,
            CameraOperation::ChangeMode => 0x02,
            CameraOperation::StartRecording => 0x03,
            CameraOperation::StopRecording => 0x04,
        }
    }

    /// Look an operation up by its code
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => CameraOperation::SimulateWifiButton,
            0x01 => CameraOperation::SimulatePowerButton,
            0x02 => CameraOperation::ChangeMode,
            0x03 => CameraOperation::StartRecording,
            0x04 => CameraOperation::StopRecording,
            _ => return None,
        })
    }
}

/// Keys of the simulated 5-key OSD cable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiveKey {
    /// Center/confirm
    Set,
    /// Left
    Left,
    /// Right
    Right,
    /// Up
    Up,
    /// Down
    Down,
}

impl FiveKey {
    /// Key code carried in the key-press payload
    pub fn code(&self) -> u8 {
        match self {
            FiveKey::Set => 0x01,
            FiveKey::Left => 0x02,
            FiveKey::Right => 0x03,
            FiveKey::Up => 0x04,
            FiveKey::Down => 0x05,
        }
    }
}

/// Open/close operations for the 5-key OSD cable simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiveKeyConnection {
    /// Start the simulation
    Open,
    /// End the simulation
    Close,
}

impl FiveKeyConnection {
    /// Operation byte carried in the connection payload
    pub fn code(&self) -> u8 {
        match self {
            FiveKeyConnection::Open => 0x01,
            FiveKeyConnection::Close => 0x02,
        }
    }
}

/// Setting ids readable with [`Command::ReadSettingDetail`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingId {
    /// OSD character set
    Charset,
    /// OSD columns
    Columns,
    /// PAL/NTSC output
    TvMode,
    /// SD card capacity
    SdCardCapacity,
    /// Remaining recording time, as decimal text
    RemainingRecordingTime,
    /// Recording resolution
    Resolution,
    /// Camera clock
    CameraTime,
}

impl SettingId {
    /// Setting id byte on the wire
    pub fn id(&self) -> u8 {
        match self {
            SettingId::Charset => 0x00,
            SettingId::Columns => 0x01,
            SettingId::TvMode => 0x02,
            SettingId::SdCardCapacity => 0x03,
            SettingId::RemainingRecordingTime => 0x04,
            SettingId::Resolution => 0x05,
            SettingId::CameraTime => 0x06,
        }
    }
}

/// Value types a setting can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingType {
    /// Unsigned byte
    U8,
    /// Signed byte
    I8,
    /// Unsigned 16-bit value
    U16,
    /// Signed 16-bit value
    I16,
    /// Floating point value
    Float,
    /// One of a list of text options
    TextSelection,
    /// Free text
    String,
    /// Menu folder
    Folder,
    /// Read-only information
    Info,
}

impl SettingType {
    /// Decode the setting type byte
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => SettingType::U8,
            1 => SettingType::I8,
            2 => SettingType::U16,
            3 => SettingType::I16,
            8 => SettingType::Float,
            9 => SettingType::TextSelection,
            10 => SettingType::String,
            11 => SettingType::Folder,
            12 => SettingType::Info,
            _ => return None,
        })
    }
}
