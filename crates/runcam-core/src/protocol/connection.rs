//! Connection management
//!
//! A [`Connection`] is the handle to one camera: it owns the transport, runs
//! every exchange through the retry loop and caches what it learns about the
//! device. One exchange is in flight at a time; the handle is not shared.

use serde::Serialize;
use tracing::{debug, warn};

use super::{
    packet, serial::open_port, CameraOperation, Command, FiveKey, FiveKeyConnection, FrameShape,
    ProtocolError, ReceivedFrame, ResponseLengths, SerialTransport, SettingId, Transport,
};
use crate::config::ConnectionConfig;
use crate::device::{DeviceInfo, Features, RecordingTime, SettingDetail};

/// Cumulative link counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Request frames written
    pub tx_frames: u64,
    /// Request bytes written
    pub tx_bytes: u64,
    /// Response frames read, valid or not
    pub rx_frames: u64,
    /// Response bytes read
    pub rx_bytes: u64,
    /// Responses rejected by the header/CRC check
    pub crc_failures: u64,
    /// Attempts beyond the first
    pub retries: u64,
    /// Exchanges that ran out of attempts
    pub failed_exchanges: u64,
}

/// Handle to one RunCam device
pub struct Connection<T: Transport> {
    /// Byte link to the camera
    transport: T,
    /// Timeouts and retry bound
    config: ConnectionConfig,
    /// Which commands have fixed-length responses
    response_lengths: ResponseLengths,
    /// Set by the first successful device-info query
    info: Option<DeviceInfo>,
    /// Recording state as last commanded
    recording: bool,
    /// Last successfully read recording time
    recording_time: Option<RecordingTime>,
    stats: LinkStats,
}

impl Connection<SerialTransport> {
    /// Open the configured serial port and initialize the camera
    pub fn open(config: ConnectionConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        let port = open_port(&config.port_name, config.baud_rate)?;
        let mut conn = Connection::new(SerialTransport::new(port), config)?;
        conn.initialize()?;
        Ok(conn)
    }
}

impl<T: Transport> Connection<T> {
    /// Create a handle over an already opened transport. No traffic is sent.
    pub fn new(transport: T, config: ConnectionConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            response_lengths: ResponseLengths::default(),
            info: None,
            recording: false,
            recording_time: None,
            stats: LinkStats::default(),
        })
    }

    /// Replace the fixed-length response table
    pub fn with_response_lengths(mut self, response_lengths: ResponseLengths) -> Self {
        self.response_lengths = response_lengths;
        self
    }

    /// Query device info, then the remaining recording time.
    ///
    /// Device info is required. Cameras that cannot report a recording time
    /// (older RCSplit firmware) are still usable, so that failure is logged
    /// and ignored.
    pub fn initialize(&mut self) -> Result<DeviceInfo, ProtocolError> {
        let info = self.query_device_info()?;
        if let Err(e) = self.query_recording_time() {
            warn!("recording time unavailable during init: {}", e);
        }
        Ok(info)
    }

    /// Active configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Fixed-length response table in use
    pub fn response_lengths(&self) -> &ResponseLengths {
        &self.response_lengths
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Cached device info, if a query has succeeded
    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.info
    }

    /// Check a feature against the cached device info (false if unknown)
    pub fn supports(&self, feature: Features) -> bool {
        self.info.map(|i| i.supports(feature)).unwrap_or(false)
    }

    /// Recording state as last commanded. No traffic.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Recording time from the last successful query
    pub fn last_recording_time(&self) -> Option<&RecordingTime> {
        self.recording_time.as_ref()
    }

    /// Link counters since the handle was created
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Encode and write one request frame
    pub fn send_command(&mut self, command: Command, payload: &[u8]) -> Result<(), ProtocolError> {
        let timeout = self.config.send_timeout();
        let sent = packet::send_command(&mut self.transport, command.id(), payload, timeout)?;
        self.stats.tx_frames += 1;
        self.stats.tx_bytes += sent as u64;
        Ok(())
    }

    /// Read a fixed-length response of `total_len` bytes
    pub fn receive_fixed(&mut self, total_len: usize) -> Result<ReceivedFrame, ProtocolError> {
        let timeout = self.config.receive_timeout();
        let frame = packet::receive_fixed(&mut self.transport, total_len, timeout)?;
        self.stats.rx_frames += 1;
        self.stats.rx_bytes += total_len as u64;
        Ok(frame)
    }

    /// Read a length-prefixed response
    pub fn receive_variable(&mut self) -> Result<ReceivedFrame, ProtocolError> {
        let timeout = self.config.receive_timeout();
        let byte_timeout = self.config.byte_timeout();
        let frame = packet::receive_variable(&mut self.transport, timeout, byte_timeout)?;
        self.stats.rx_frames += 1;
        self.stats.rx_bytes += (frame.data_len + 5) as u64;
        Ok(frame)
    }

    /// Decode strategy for a command that must have a fixed-length response
    fn fixed_shape(&self, command: Command) -> Result<FrameShape, ProtocolError> {
        self.response_lengths
            .lookup(command)
            .map(FrameShape::Fixed)
            .ok_or(ProtocolError::UnknownResponseLength(command.id()))
    }

    /// One send/receive/validate cycle
    fn attempt(
        &mut self,
        command: Command,
        payload: &[u8],
        shape: FrameShape,
    ) -> Result<ReceivedFrame, ProtocolError> {
        self.send_command(command, payload)?;
        let frame = match shape {
            FrameShape::Fixed(len) => self.receive_fixed(len)?,
            FrameShape::Variable => self.receive_variable()?,
        };
        frame.validated().map_err(|e| {
            self.stats.crc_failures += 1;
            e
        })
    }

    /// Run `command` until a valid response arrives or the retry bound is hit.
    ///
    /// Link and integrity errors are swallowed between attempts; what comes
    /// out is a valid frame, [`ProtocolError::ExhaustedRetries`], or a request
    /// that could not be encoded at all.
    fn exchange(
        &mut self,
        command: Command,
        payload: &[u8],
        shape: FrameShape,
    ) -> Result<ReceivedFrame, ProtocolError> {
        let attempts = self.config.retries;

        for attempt in 1..=attempts {
            if attempt > 1 {
                self.stats.retries += 1;
            }

            match self.attempt(command, payload, shape) {
                Ok(frame) => return Ok(frame),
                Err(e) if e.is_retryable() => {
                    debug!(
                        "{:?}: attempt {}/{} failed: {}",
                        command, attempt, attempts, e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        warn!("{:?}: no valid response after {} attempts", command, attempts);
        self.stats.failed_exchanges += 1;
        Err(ProtocolError::ExhaustedRetries {
            command: command.id(),
            attempts,
        })
    }

    /// Send `command`, then wait for a valid response if the camera answers
    /// it. Commands without a table entry are read as variable-length.
    fn request(
        &mut self,
        command: Command,
        payload: &[u8],
    ) -> Result<Option<ReceivedFrame>, ProtocolError> {
        if !command.expects_response() {
            self.send_command(command, payload)?;
            return Ok(None);
        }
        let shape = self.response_lengths.shape(command);
        self.exchange(command, payload, shape).map(Some)
    }

    /// Read protocol version and features, and cache them
    pub fn query_device_info(&mut self) -> Result<DeviceInfo, ProtocolError> {
        let shape = self.fixed_shape(Command::GetDeviceInfo)?;
        let frame = self.exchange(Command::GetDeviceInfo, &[], shape)?;
        let payload = frame.into_result()?;
        let info = DeviceInfo::from_payload(&payload)
            .ok_or(ProtocolError::TruncatedFrame(payload.len()))?;

        debug!(
            "device info: version {:?}, {:?}",
            info.protocol_version, info.features
        );
        self.info = Some(info);
        Ok(info)
    }

    /// Read one chunk of a setting's value
    pub fn read_setting_detail(
        &mut self,
        setting: SettingId,
        chunk: u8,
    ) -> Result<SettingDetail, ProtocolError> {
        let frame = self
            .request(Command::ReadSettingDetail, &[setting.id(), chunk])?
            .ok_or(ProtocolError::TruncatedFrame(0))?;
        let data_len = frame.data_len;
        SettingDetail::from_frame(frame).ok_or(ProtocolError::TruncatedFrame(data_len))
    }

    /// Read every chunk of a setting's value and join the payloads.
    ///
    /// A camera that still reports pending chunks after chunk index 255
    /// fails with [`ProtocolError::ChunkLimit`]; partial values are never
    /// returned.
    pub fn read_setting(&mut self, setting: SettingId) -> Result<SettingDetail, ProtocolError> {
        let mut detail = self.read_setting_detail(setting, 0)?;
        let mut chunk: u8 = 0;

        while detail.remaining_chunks > 0 {
            chunk = chunk.checked_add(1).ok_or(ProtocolError::ChunkLimit {
                setting: setting.id(),
                remaining: detail.remaining_chunks,
            })?;
            let next = self.read_setting_detail(setting, chunk)?;
            detail.payload.extend_from_slice(&next.payload);
            detail.remaining_chunks = next.remaining_chunks;
        }

        Ok(detail)
    }

    /// Read the remaining recording time and cache it
    pub fn query_recording_time(&mut self) -> Result<RecordingTime, ProtocolError> {
        let detail = self.read_setting_detail(SettingId::RemainingRecordingTime, 0)?;
        let time = RecordingTime::from_payload(&detail.payload);
        debug!("recording time: {:?} -> {}s", time.text, time.seconds);
        self.recording_time = Some(time.clone());
        Ok(time)
    }

    /// Send a camera-control operation. The camera does not answer these.
    pub fn camera_control(&mut self, operation: CameraOperation) -> Result<(), ProtocolError> {
        self.request(Command::CameraControl, &[operation.code()])?;
        match operation {
            CameraOperation::StartRecording => self.recording = true,
            CameraOperation::StopRecording => self.recording = false,
            _ => {}
        }
        Ok(())
    }

    /// Start recording if stopped, stop if recording. Returns the new state.
    pub fn toggle_recording(&mut self) -> Result<bool, ProtocolError> {
        let operation = if self.recording {
            CameraOperation::StopRecording
        } else {
            CameraOperation::StartRecording
        };

        if let Some(info) = self.info {
            let needed = match operation {
                CameraOperation::StopRecording => Features::STOP_RECORDING,
                _ => Features::START_RECORDING,
            };
            if !info.supports(needed) {
                warn!("camera does not advertise {:?}, sending anyway", needed);
            }
        }

        self.camera_control(operation)?;
        debug!("recording toggled, now {}", self.recording);
        Ok(self.recording)
    }

    /// Press a key of the simulated 5-key OSD cable
    pub fn simulate_key_press(&mut self, key: FiveKey) -> Result<(), ProtocolError> {
        let shape = self.fixed_shape(Command::FiveKeyPress)?;
        self.exchange(Command::FiveKeyPress, &[key.code()], shape)?;
        Ok(())
    }

    /// Release the pressed key of the simulated 5-key OSD cable
    pub fn simulate_key_release(&mut self) -> Result<(), ProtocolError> {
        let shape = self.fixed_shape(Command::FiveKeyRelease)?;
        self.exchange(Command::FiveKeyRelease, &[], shape)?;
        Ok(())
    }

    /// Start the 5-key cable simulation. Returns whether the camera accepted
    /// it.
    pub fn open_five_key_connection(&mut self) -> Result<bool, ProtocolError> {
        self.five_key_connection(FiveKeyConnection::Open)
    }

    /// End the 5-key cable simulation. Returns whether the camera accepted
    /// it.
    pub fn close_five_key_connection(&mut self) -> Result<bool, ProtocolError> {
        self.five_key_connection(FiveKeyConnection::Close)
    }

    fn five_key_connection(
        &mut self,
        operation: FiveKeyConnection,
    ) -> Result<bool, ProtocolError> {
        let shape = self.fixed_shape(Command::FiveKeyConnection)?;
        let payload = self
            .exchange(Command::FiveKeyConnection, &[operation.code()], shape)?
            .into_result()?;
        let accepted = payload.first().map(|r| r & 0x0F == 0x01).unwrap_or(false);
        debug!("5-key {:?}: accepted = {}", operation, accepted);
        Ok(accepted)
    }
}
