//! Demo Mode - Simulated RunCam camera
//!
//! A [`Transport`] that answers request frames the way a camera would, for
//! testing without hardware. Responses can be corrupted or dropped on demand
//! or at random to exercise the retry path.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::trace;

use crate::device::{DeviceInfo, Features, ProtocolVersion};
use crate::protocol::{
    crc::crc8_dvb_s2, decode_command, CameraOperation, Command, ProtocolError, SettingId,
    Transport, MAX_PACKET_SIZE, PROTOCOL_HEADER,
};

/// Setting type byte used for text settings
const SETTING_TYPE_STRING: u8 = 10;

/// Value bytes per read-setting-detail response (header, chunk count,
/// length, type and CRC take the rest of a packet)
const SETTING_CHUNK_SIZE: usize = MAX_PACKET_SIZE - 5;

/// Simulated camera
pub struct DemoCamera {
    /// Reported by get-device-info
    info: DeviceInfo,
    /// Setting id -> (type byte, value)
    settings: HashMap<u8, (u8, Vec<u8>)>,
    /// Set/cleared by camera-control frames
    recording: bool,
    /// Set/cleared by 5-key connection frames
    five_key_open: bool,
    /// Last pressed key, cleared on release
    pressed_key: Option<u8>,
    /// Every valid request as (command id, payload)
    received: Vec<(u8, Vec<u8>)>,
    /// Bytes waiting to be read by the host
    outbox: VecDeque<u8>,
    /// Responses still to corrupt
    corrupt_next: usize,
    /// Responses still to drop
    drop_next: usize,
    /// Chance of corrupting any response
    corruption_rate: f64,
    rng: StdRng,
}

impl Default for DemoCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoCamera {
    /// A v1.0 camera with recording support and 2 hours of space left
    pub fn new() -> Self {
        let mut settings = HashMap::new();
        settings.insert(
            SettingId::RemainingRecordingTime.id(),
            (SETTING_TYPE_STRING, b"7200".to_vec()),
        );
        settings.insert(
            SettingId::Resolution.id(),
            (SETTING_TYPE_STRING, b"1080P".to_vec()),
        );

        Self {
            info: DeviceInfo {
                protocol_version: ProtocolVersion::V1_0,
                features: Features::SIMULATE_POWER_BUTTON
                    | Features::SIMULATE_WIFI_BUTTON
                    | Features::CHANGE_MODE
                    | Features::SIMULATE_5_KEY_OSD_CABLE
                    | Features::START_RECORDING
                    | Features::STOP_RECORDING,
            },
            settings,
            recording: false,
            five_key_open: false,
            pressed_key: None,
            received: Vec::new(),
            outbox: VecDeque::new(),
            corrupt_next: 0,
            drop_next: 0,
            corruption_rate: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Report `info` to get-device-info
    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    /// Set the raw text returned for the remaining recording time
    pub fn with_recording_time(mut self, text: &str) -> Self {
        self.set_setting(SettingId::RemainingRecordingTime, SETTING_TYPE_STRING, text.as_bytes());
        self
    }

    /// Corrupt each response with probability `rate`, reproducibly from `seed`
    pub fn with_corruption(mut self, rate: f64, seed: u64) -> Self {
        self.corruption_rate = rate.clamp(0.0, 1.0);
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Store a setting value. Values longer than one packet are served in
    /// chunks; a value needing more than 256 chunks goes unanswered.
    pub fn set_setting(&mut self, setting: SettingId, setting_type: u8, value: &[u8]) {
        self.settings
            .insert(setting.id(), (setting_type, value.to_vec()));
    }

    /// Forget a setting; reads of it go unanswered
    pub fn remove_setting(&mut self, setting: SettingId) {
        self.settings.remove(&setting.id());
    }

    /// Flip the CRC of the next `n` responses
    pub fn corrupt_next(&mut self, n: usize) {
        self.corrupt_next = n;
    }

    /// Swallow the next `n` responses (the host sees a timeout)
    pub fn drop_next(&mut self, n: usize) {
        self.drop_next = n;
    }

    /// Whether a start-recording frame was the last one received
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Whether the 5-key cable simulation is open
    pub fn five_key_open(&self) -> bool {
        self.five_key_open
    }

    /// Key code currently held down
    pub fn pressed_key(&self) -> Option<u8> {
        self.pressed_key
    }

    /// Valid requests seen so far
    pub fn received(&self) -> &[(u8, Vec<u8>)] {
        &self.received
    }

    /// Number of valid requests for `command`
    pub fn count(&self, command: Command) -> usize {
        self.received
            .iter()
            .filter(|(id, _)| *id == command.id())
            .count()
    }

    /// Response body (CRC not yet appended) for a request, if the camera answers
    fn respond(&mut self, command_id: u8, payload: &[u8]) -> Option<Vec<u8>> {
        match Command::from_id(command_id)? {
            Command::GetDeviceInfo => {
                let mut body = vec![PROTOCOL_HEADER];
                body.extend_from_slice(&self.info.to_payload());
                Some(body)
            }
            Command::CameraControl => {
                match payload.first().copied().and_then(CameraOperation::from_code) {
                    Some(CameraOperation::StartRecording) => self.recording = true,
                    Some(CameraOperation::StopRecording) => self.recording = false,
                    _ => {}
                }
                None
            }
            Command::FiveKeyPress => {
                self.pressed_key = payload.first().copied();
                Some(vec![PROTOCOL_HEADER])
            }
            Command::FiveKeyRelease => {
                self.pressed_key = None;
                Some(vec![PROTOCOL_HEADER])
            }
            Command::FiveKeyConnection => {
                let op = payload.first().copied().unwrap_or(0);
                let accepted = match op {
                    0x01 => {
                        self.five_key_open = true;
                        true
                    }
                    0x02 => {
                        self.five_key_open = false;
                        true
                    }
                    _ => false,
                };
                Some(vec![PROTOCOL_HEADER, (op << 4) | u8::from(accepted)])
            }
            Command::ReadSettingDetail => {
                let setting_id = *payload.first()?;
                let index = usize::from(payload.get(1).copied().unwrap_or(0));
                let (setting_type, value) = self.settings.get(&setting_id)?;

                let chunks: Vec<&[u8]> = if value.is_empty() {
                    vec![value.as_slice()]
                } else {
                    value.chunks(SETTING_CHUNK_SIZE).collect()
                };
                let chunk = *chunks.get(index)?;
                let remaining = u8::try_from(chunks.len() - 1 - index).ok()?;

                let mut body = vec![PROTOCOL_HEADER, remaining, chunk.len() as u8, *setting_type];
                body.extend_from_slice(chunk);
                Some(body)
            }
            Command::GetSettings | Command::WriteSetting | Command::RequestFcAttitude => None,
        }
    }
}

impl Transport for DemoCamera {
    fn transmit(&mut self, bytes: &[u8], _timeout: Duration) -> Result<(), ProtocolError> {
        // A new request abandons whatever the host did not read
        self.outbox.clear();

        let (command_id, payload) = match decode_command(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                trace!("demo camera ignoring bad request: {}", e);
                return Ok(());
            }
        };
        self.received.push((command_id, payload.clone()));

        let Some(mut response) = self.respond(command_id, &payload) else {
            return Ok(());
        };

        if self.drop_next > 0 {
            self.drop_next -= 1;
            return Ok(());
        }

        response.push(crc8_dvb_s2(&response));

        let corrupt = if self.corrupt_next > 0 {
            self.corrupt_next -= 1;
            true
        } else {
            self.corruption_rate > 0.0 && self.rng.gen_bool(self.corruption_rate)
        };
        if corrupt {
            if let Some(last) = response.last_mut() {
                *last ^= 0xFF;
            }
        }

        self.outbox.extend(response);
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<(), ProtocolError> {
        if self.outbox.len() < buf.len() {
            self.outbox.clear();
            return Err(ProtocolError::Timeout);
        }
        let n = buf.len();
        for (dst, src) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *dst = src;
        }
        Ok(())
    }
}
