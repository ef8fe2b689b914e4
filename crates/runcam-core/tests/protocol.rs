use pretty_assertions::assert_eq;
use runcam_core::config::ConnectionConfig;
use runcam_core::protocol::crc::crc8_dvb_s2;
use runcam_core::protocol::{
    receive_fixed, receive_variable, Command, Connection, ProtocolError, Transport,
};
use std::collections::VecDeque;
use std::time::Duration;

/// Mock serial link: each transmitted frame releases the next scripted reply
struct MockSerial {
    sent: Vec<Vec<u8>>,
    replies: VecDeque<Option<Vec<u8>>>,
    rx: VecDeque<u8>,
    fail_on_send: bool,
}

impl MockSerial {
    fn new() -> Self {
        Self {
            sent: Vec::new(),
            replies: VecDeque::new(),
            rx: VecDeque::new(),
            fail_on_send: false,
        }
    }

    /// Queue a reply with a correct CRC appended
    fn reply(mut self, body: &[u8]) -> Self {
        self.replies.push_back(Some(with_crc(body)));
        self
    }

    /// Queue a reply exactly as given
    fn reply_raw(mut self, frame: Vec<u8>) -> Self {
        self.replies.push_back(Some(frame));
        self
    }

    /// Queue a reply that never arrives
    fn silence(mut self) -> Self {
        self.replies.push_back(None);
        self
    }

    /// Bytes already waiting on the line, without a request
    fn preload(bytes: Vec<u8>) -> Self {
        let mut mock = Self::new();
        mock.rx.extend(bytes);
        mock
    }
}

impl Transport for MockSerial {
    fn transmit(&mut self, bytes: &[u8], _timeout: Duration) -> Result<(), ProtocolError> {
        if self.fail_on_send {
            return Err(ProtocolError::SerialError("Serial write failed".to_string()));
        }
        self.sent.push(bytes.to_vec());
        self.rx.clear();
        if let Some(Some(reply)) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<(), ProtocolError> {
        if self.rx.len() < buf.len() {
            self.rx.clear();
            return Err(ProtocolError::Timeout);
        }
        let n = buf.len();
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(())
    }
}

fn with_crc(body: &[u8]) -> Vec<u8> {
    let mut frame = body.to_vec();
    frame.push(crc8_dvb_s2(body));
    frame
}

fn connect(mock: MockSerial, retries: u8) -> Connection<MockSerial> {
    let config = ConnectionConfig {
        retries,
        ..ConnectionConfig::default()
    };
    Connection::new(mock, config).expect("valid config")
}

const TIMEOUT: Duration = Duration::from_millis(10);

#[test]
fn test_device_info_happy_path() {
    let mock = MockSerial::new().reply(&[0xCC, 0x01, 0x03, 0x00]);
    let mut conn = connect(mock, 3);

    let info = conn.query_device_info().expect("device info");
    assert_eq!(info.protocol_version.byte(), 0x01);
    assert_eq!(info.features.bits(), 0x0003);
    assert_eq!(conn.transport().sent.len(), 1);
}

#[test]
fn test_device_info_known_crc() {
    // Wire bytes as a camera sends them
    let mock = MockSerial::new().reply_raw(vec![0xCC, 0x01, 0x03, 0x00, 0x94]);
    let mut conn = connect(mock, 1);
    assert!(conn.query_device_info().is_ok());
}

#[test]
fn test_recording_time_scenario() {
    let mock = MockSerial::new().reply(&[0xCC, 0x00, 0x02, 0x0A, b'4', b'2']);
    let mut conn = connect(mock, 3);

    let time = conn.query_recording_time().expect("recording time");
    assert_eq!(time.seconds, 42);
    assert_eq!(time.length, 2);
    assert_eq!(time.text, "42");
    assert_eq!(conn.last_recording_time(), Some(&time));

    let request = &conn.transport().sent[0];
    assert_eq!(&request[..4], &[0xCC, 0x11, 0x04, 0x00]);
}

#[test]
fn test_recording_time_non_numeric_is_zero() {
    let mock = MockSerial::new().reply(&[0xCC, 0x00, 0x03, 0x0A, b'N', b'/', b'A']);
    let mut conn = connect(mock, 3);

    let time = conn.query_recording_time().expect("recording time");
    assert_eq!(time.seconds, 0);
    assert_eq!(time.text, "N/A");
}

#[test]
fn test_corrupted_then_recovered() {
    let mut bad = with_crc(&[0xCC, 0x00, 0x41, 0x00]);
    bad[4] ^= 0x5A;
    let mock = MockSerial::new()
        .reply_raw(bad)
        .reply(&[0xCC, 0x01, 0x03, 0x00]);
    let mut conn = connect(mock, 3);

    let info = conn.query_device_info().expect("second attempt succeeds");
    assert_eq!(info.protocol_version.byte(), 0x01);
    assert_eq!(info.features.bits(), 0x0003);
    assert_eq!(conn.device_info(), Some(info));
    assert_eq!(conn.transport().sent.len(), 2);

    let stats = conn.stats();
    assert_eq!(stats.crc_failures, 1);
    assert_eq!(stats.retries, 1);
    assert_eq!(stats.failed_exchanges, 0);
}

#[test]
fn test_timeout_then_recovered() {
    let mock = MockSerial::new()
        .silence()
        .reply(&[0xCC, 0x00, 0x04, 0x0A, b'3', b'6', b'0', b'0']);
    let mut conn = connect(mock, 2);

    let time = conn.query_recording_time().expect("second attempt succeeds");
    assert_eq!(time.seconds, 3600);
}

#[test]
fn test_retry_bound_respected() {
    for retries in 1..=5u8 {
        let mut mock = MockSerial::new();
        for _ in 0..10 {
            let mut bad = with_crc(&[0xCC, 0x01, 0x03, 0x00]);
            bad[4] ^= 0x01;
            mock = mock.reply_raw(bad);
        }
        let mut conn = connect(mock, retries);

        let err = conn.query_device_info().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ExhaustedRetries { command: 0x00, attempts } if attempts == retries
        ));
        assert_eq!(conn.transport().sent.len(), retries as usize);
        assert_eq!(conn.stats().crc_failures, retries as u64);
        assert!(conn.device_info().is_none());
    }
}

#[test]
fn test_failed_query_leaves_cache_untouched() {
    let mock = MockSerial::new()
        .reply(&[0xCC, 0x00, 0x02, 0x0A, b'4', b'2'])
        .silence()
        .silence();
    let mut conn = connect(mock, 2);

    conn.query_recording_time().expect("first query");
    assert!(conn.query_recording_time().is_err());
    assert_eq!(conn.last_recording_time().map(|t| t.seconds), Some(42));
}

#[test]
fn test_send_failure_is_retried() {
    let mut mock = MockSerial::new();
    mock.fail_on_send = true;
    let mut conn = connect(mock, 4);

    let err = conn.query_device_info().unwrap_err();
    assert!(matches!(err, ProtocolError::ExhaustedRetries { attempts: 4, .. }));
    assert_eq!(conn.stats().retries, 3);
}

#[test]
fn test_wrong_header_rejected() {
    let mock = MockSerial::new()
        .reply(&[0xAA, 0x01, 0x03, 0x00])
        .reply(&[0xCC, 0x01, 0x07, 0x00]);
    let mut conn = connect(mock, 2);

    let info = conn.query_device_info().expect("second frame");
    assert_eq!(info.features.bits(), 0x0007);
}

#[test]
fn test_toggle_frames_differ_only_in_operation() {
    let mut conn = connect(MockSerial::new(), 3);

    assert!(conn.toggle_recording().expect("start"));
    assert!(conn.is_recording());
    assert!(!conn.toggle_recording().expect("stop"));
    assert!(!conn.is_recording());

    let sent = &conn.transport().sent;
    assert_eq!(sent.len(), 2);
    let (start, stop) = (&sent[0], &sent[1]);
    assert_eq!(&start[..3], &[0xCC, 0x01, 0x03]);
    assert_eq!(&stop[..3], &[0xCC, 0x01, 0x04]);
    assert_eq!(&start[..2], &stop[..2]);
    assert_eq!(start.len(), stop.len());
}

#[test]
fn test_toggle_send_failure_keeps_state() {
    let mut mock = MockSerial::new();
    mock.fail_on_send = true;
    let mut conn = connect(mock, 3);

    assert!(conn.toggle_recording().is_err());
    assert!(!conn.is_recording());
}

#[test]
fn test_is_recording_makes_no_traffic() {
    let conn = connect(MockSerial::new(), 3);
    assert!(!conn.is_recording());
    assert!(conn.transport().sent.is_empty());
}

#[test]
fn test_receive_fixed_hides_invalid_payload() {
    let mut bad = with_crc(&[0xCC, 0x01, 0x03, 0x00]);
    bad[2] ^= 0x80;
    let mut mock = MockSerial::preload(bad);

    let frame = receive_fixed(&mut mock, 5, TIMEOUT).expect("read");
    assert!(!frame.is_valid());
    assert_eq!(frame.payload(), None);
    assert!(frame.into_payload().is_none());
}

#[test]
fn test_receive_variable_hides_invalid_payload() {
    let mut bad = with_crc(&[0xCC, 0x00, 0x02, 0x0A, b'4', b'2']);
    bad[4] = b'9';
    let mut mock = MockSerial::preload(bad);

    let frame = receive_variable(&mut mock, TIMEOUT, TIMEOUT).expect("read");
    assert!(!frame.is_valid());
    assert_eq!(frame.data_len, 2);
    assert_eq!(frame.payload(), None);
}

#[test]
fn test_receive_variable_reads_exactly_declared_length() {
    let mut bytes = with_crc(&[0xCC, 0x00, 0x03, 0x0A, b'1', b'2', b'3']);
    // Trailing bytes of a later frame must stay unread
    bytes.extend_from_slice(&[0xEE, 0xEE]);
    let mut mock = MockSerial::preload(bytes);

    let frame = receive_variable(&mut mock, TIMEOUT, TIMEOUT).expect("read");
    assert_eq!(frame.payload(), Some(&b"123"[..]));
    assert_eq!(mock.rx.len(), 2);
}

#[test]
fn test_receive_variable_empty_payload() {
    let mut mock = MockSerial::preload(with_crc(&[0xCC, 0x00, 0x00, 0x0A]));
    let frame = receive_variable(&mut mock, TIMEOUT, TIMEOUT).expect("read");
    assert!(frame.is_valid());
    assert_eq!(frame.payload(), Some(&[][..]));
}

#[test]
fn test_receive_short_read_is_error() {
    let mut mock = MockSerial::preload(vec![0xCC, 0x01]);
    assert!(matches!(
        receive_fixed(&mut mock, 5, TIMEOUT),
        Err(ProtocolError::Timeout)
    ));
}

#[test]
fn test_five_key_press_release() {
    let mock = MockSerial::new().reply(&[0xCC]).reply(&[0xCC]);
    let mut conn = connect(mock, 3);

    conn.simulate_key_press(runcam_core::protocol::FiveKey::Up)
        .expect("press");
    conn.simulate_key_release().expect("release");

    let sent = &conn.transport().sent;
    assert_eq!(&sent[0][1..3], &[Command::FiveKeyPress.id(), 0x04]);
    assert_eq!(sent[1][1], Command::FiveKeyRelease.id());
    assert_eq!(sent[1].len(), 3);
}

#[test]
fn test_stats_count_bytes() {
    let mock = MockSerial::new().reply(&[0xCC, 0x01, 0x03, 0x00]);
    let mut conn = connect(mock, 3);
    conn.query_device_info().expect("device info");

    let stats = conn.stats();
    assert_eq!(stats.tx_frames, 1);
    assert_eq!(stats.tx_bytes, 3);
    assert_eq!(stats.rx_frames, 1);
    assert_eq!(stats.rx_bytes, 5);
}
