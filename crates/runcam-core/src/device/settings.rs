//! Setting values
//!
//! Payloads of read-setting-detail responses.

use serde::{Deserialize, Serialize};

use crate::protocol::{ReceivedFrame, SettingType};

/// One chunk of a setting's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingDetail {
    /// Raw setting type byte
    pub setting_type: u8,
    /// Chunks the camera still holds after this one
    pub remaining_chunks: u8,
    /// Value bytes
    pub payload: Vec<u8>,
}

impl SettingDetail {
    /// Build from a variable-length frame; `None` if the frame is invalid
    pub fn from_frame(frame: ReceivedFrame) -> Option<Self> {
        let setting_type = frame.setting_type?;
        let remaining_chunks = frame.remaining_chunks?;
        let payload = frame.into_payload()?;
        Some(Self {
            setting_type,
            remaining_chunks,
            payload,
        })
    }

    /// Decoded setting type, if known
    pub fn kind(&self) -> Option<SettingType> {
        SettingType::from_code(self.setting_type)
    }

    /// Value as text, with invalid UTF-8 replaced
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Recording time reported by the camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingTime {
    /// Seconds, parsed leniently from `text`
    pub seconds: i64,
    /// Text as sent by the camera
    pub text: String,
    /// Length of the text payload in bytes
    pub length: usize,
}

impl RecordingTime {
    /// Build from the text payload of a recording-time response
    pub fn from_payload(payload: &[u8]) -> Self {
        let text = String::from_utf8_lossy(payload).into_owned();
        Self {
            seconds: parse_leading_int(&text),
            text,
            length: payload.len(),
        }
    }
}

/// Parse an integer the way C's `atoi` does.
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, and no digits at all gives 0. Out-of-range values saturate.
pub fn parse_leading_int(s: &str) -> i64 {
    let mut chars = s
        .trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'))
        .chars()
        .peekable();

    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for c in chars {
        let Some(digit) = c.to_digit(10) else {
            break;
        };
        let digit = digit as i64;
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}
