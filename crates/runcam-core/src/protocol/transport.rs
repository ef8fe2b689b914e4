//! Byte transport
//!
//! The engine only needs two things from the link: push a frame out within a
//! timeout, and fill a buffer within a timeout.

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::trace;

use super::ProtocolError;

/// A half-duplex byte link to the camera
pub trait Transport {
    /// Write all of `bytes` to the link
    fn transmit(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), ProtocolError>;

    /// Fill all of `buf` from the link, or fail once `timeout` has elapsed
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), ProtocolError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transmit(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), ProtocolError> {
        (**self).transmit(bytes, timeout)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), ProtocolError> {
        (**self).receive(buf, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transmit(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), ProtocolError> {
        (**self).transmit(bytes, timeout)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), ProtocolError> {
        (**self).receive(buf, timeout)
    }
}

/// Serial port transport
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    poll_interval: Duration,
}

impl SerialTransport {
    /// Wrap an opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            poll_interval: Duration::from_micros(200),
        }
    }

    /// Release the underlying port
    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

fn map_io(e: std::io::Error) -> ProtocolError {
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => ProtocolError::Timeout,
        _ => ProtocolError::SerialError(e.to_string()),
    }
}

impl Transport for SerialTransport {
    fn transmit(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), ProtocolError> {
        // Drop anything left over from an earlier, abandoned exchange
        if let Err(e) = self.port.clear(serialport::ClearBuffer::Input) {
            trace!("clear input failed: {} (continuing)", e);
        }

        self.port
            .set_timeout(timeout)
            .map_err(|e| ProtocolError::SerialError(e.to_string()))?;

        // No flush(): it drains via tcdrain, which blocks on some USB adapters.
        self.port.write_all(bytes).map_err(map_io)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), ProtocolError> {
        let start = Instant::now();
        let mut offset = 0;

        while offset < buf.len() {
            if start.elapsed() > timeout {
                trace!(
                    "receive timed out after {} of {} bytes",
                    offset,
                    buf.len()
                );
                return Err(ProtocolError::Timeout);
            }

            let available = self
                .port
                .bytes_to_read()
                .map_err(|e| ProtocolError::SerialError(e.to_string()))?
                as usize;

            if available == 0 {
                std::thread::sleep(self.poll_interval);
                continue;
            }

            let to_read = available.min(buf.len() - offset);
            match self.port.read(&mut buf[offset..offset + to_read]) {
                Ok(0) => return Err(ProtocolError::Timeout),
                Ok(n) => offset += n,
                Err(ref e)
                    if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock =>
                {
                    continue;
                }
                Err(e) => return Err(map_io(e)),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Loopback {
        data: Vec<u8>,
    }

    impl Transport for Loopback {
        fn transmit(&mut self, bytes: &[u8], _timeout: Duration) -> Result<(), ProtocolError> {
            self.data.extend_from_slice(bytes);
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<(), ProtocolError> {
            if self.data.len() < buf.len() {
                return Err(ProtocolError::Timeout);
            }
            let rest = self.data.split_off(buf.len());
            buf.copy_from_slice(&self.data);
            self.data = rest;
            Ok(())
        }
    }

    fn roundtrip<T: Transport>(mut t: T) -> Result<[u8; 2], ProtocolError> {
        t.transmit(&[1, 2], Duration::ZERO)?;
        let mut buf = [0u8; 2];
        t.receive(&mut buf, Duration::ZERO)?;
        Ok(buf)
    }

    #[test]
    fn test_forwarding_impls() {
        let mut inner = Loopback { data: Vec::new() };
        assert_eq!(roundtrip(&mut inner).expect("by reference"), [1, 2]);

        let boxed: Box<dyn Transport> = Box::new(Loopback { data: Vec::new() });
        assert_eq!(roundtrip(boxed).expect("boxed"), [1, 2]);
    }

    #[test]
    fn test_short_read_times_out() {
        let mut t = Loopback { data: vec![0xCC] };
        let mut buf = [0u8; 2];
        assert!(matches!(
            t.receive(&mut buf, Duration::ZERO),
            Err(ProtocolError::Timeout)
        ));
    }

    #[test]
    fn test_map_io() {
        let err = map_io(std::io::Error::new(ErrorKind::TimedOut, "slow"));
        assert!(matches!(err, ProtocolError::Timeout));
        let err = map_io(std::io::Error::new(ErrorKind::BrokenPipe, "gone"));
        assert!(matches!(err, ProtocolError::SerialError(_)));
    }
}
