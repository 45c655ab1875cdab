//! We use this mocking module in unit tests to emulate the emitter's serial port.
//!
//! Responses are scripted up front and released one per write, the way the
//! emitter answers each command, so trailing bytes only ever belong to the
//! exchange in flight.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::channel::{ByteChannel, ChannelOpener, LinkSettings};

#[derive(Debug, Default)]
struct MockState {
    /// Everything written to the port.
    written: Vec<u8>,
    /// Responses not yet released.
    scripted: VecDeque<Vec<u8>>,
    /// Released bytes waiting to be read.
    readable: VecDeque<u8>,
    open: bool,
    /// Times `close` was called.
    closes: usize,
    /// Reads left that time out before any data is handed out.
    timeouts: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    /// Reads return no bytes, as at end of stream
    end_of_stream: bool,
}

/// Our mock type used to emulate a serial port. Clones share the same port.
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// Simulated timeout error
    Timeout,
    /// No port with the requested name
    NotFound,
    /// Generic simulated error for testing
    SimulatedError,
    /// Every scripted response has been read
    Exhausted,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::NotFound => embedded_io::ErrorKind::NotFound,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
            MockSerialError::Exhausted => embedded_io::ErrorKind::BrokenPipe,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state();
        if state.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        state.written.extend_from_slice(buf);
        if let Some(response) = state.scripted.pop_front() {
            state.readable.extend(response);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.state().should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state();
        if state.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        if state.timeouts > 0 {
            state.timeouts -= 1;
            return Err(MockSerialError::Timeout);
        }
        if state.end_of_stream {
            return Ok(0);
        }
        if state.readable.is_empty() {
            return Err(MockSerialError::Exhausted);
        }

        let bytes_to_read = core::cmp::min(buf.len(), state.readable.len());
        for (slot, byte) in buf.iter_mut().zip(state.readable.drain(..bytes_to_read)) {
            *slot = byte;
        }
        Ok(bytes_to_read)
    }
}

impl ByteChannel for MockSerial {
    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        let state = self.state();
        if state.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(state.readable.len())
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state();
        state.open = false;
        state.closes += 1;
        Ok(())
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with nothing scripted
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Script the response released by the next unanswered write.
    pub fn queue_response(&self, response: &[u8]) {
        self.state().scripted.push_back(response.to_vec());
    }

    /// Make bytes readable immediately, without waiting for a write.
    pub fn push_readable(&self, bytes: &[u8]) {
        self.state().readable.extend(bytes.iter().copied());
    }

    /// Get a copy of the data that was written to this mock serial port
    pub fn written_data(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// Clear the write buffer
    pub fn clear_written_data(&self) {
        self.state().written.clear();
    }

    /// Scripted responses that no write has released yet.
    pub fn pending_responses(&self) -> usize {
        self.state().scripted.len()
    }

    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    fn set_open(&self, open: bool) {
        self.state().open = open;
    }

    /// Make the next `count` reads time out.
    pub fn set_timeouts(&self, count: usize) {
        self.state().timeouts = count;
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&self, should_error: bool) {
        self.state().should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&self, should_error: bool) {
        self.state().should_error_on_read = should_error;
    }

    /// Configure whether reads report end of stream
    pub fn set_end_of_stream(&self, end_of_stream: bool) {
        self.state().end_of_stream = end_of_stream;
    }
}

/// Hands out [`MockSerial`] ports by name.
#[derive(Debug, Default)]
pub struct MockOpener {
    ports: Vec<(String, MockSerial)>,
    /// Settings passed to every successful open, in order.
    pub opened_with: Vec<LinkSettings>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, name: &str, port: MockSerial) -> Self {
        self.ports.push((name.to_string(), port));
        self
    }
}

impl ChannelOpener for MockOpener {
    type Channel = MockSerial;

    fn open(&mut self, port: &str, settings: &LinkSettings) -> Result<MockSerial, MockSerialError> {
        let serial = self
            .ports
            .iter()
            .find(|(name, _)| name == port)
            .map(|(_, serial)| serial.clone())
            .ok_or(MockSerialError::NotFound)?;
        serial.set_open(true);
        self.opened_with.push(*settings);
        Ok(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_new_mock_serial() {
        let mock = MockSerial::new();
        assert!(mock.written_data().is_empty());
        assert_eq!(mock.pending_responses(), 0);
        assert!(!mock.is_open());
    }

    #[test]
    fn test_write_multiple_times() {
        let mut mock = MockSerial::new();
        mock.write(b"V0100\r").unwrap();
        mock.write(b"M0300\r").unwrap();
        assert_eq!(mock.written_data(), b"V0100\rM0300\r");
    }

    #[test]
    fn test_each_write_releases_one_response() {
        let mut mock = MockSerial::new();
        mock.queue_response(b"0450>");
        mock.queue_response(b"1>");
        assert_eq!(mock.clone().bytes_available().unwrap(), 0);

        mock.write(b"m\r").unwrap();
        assert_eq!(mock.bytes_available().unwrap(), 5);
        assert_eq!(mock.pending_responses(), 1);

        let mut buffer = [0u8; 8];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer[..5], b"0450>");
    }

    #[test]
    fn test_read_partial_data() {
        let mut mock = MockSerial::new();
        mock.push_readable(b"Long response data");

        let mut buffer = [0u8; 5];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Long ");
        assert_eq!(mock.bytes_available().unwrap(), 13);
    }

    #[test]
    fn test_read_when_exhausted() {
        let mut mock = MockSerial::new();
        let mut buffer = [0u8; 10];
        let result = mock.read(&mut buffer);
        assert!(matches!(result, Err(MockSerialError::Exhausted)));
    }

    #[test]
    fn test_timeouts_before_data() {
        let mut mock = MockSerial::new();
        mock.push_readable(b">");
        mock.set_timeouts(2);

        let mut buffer = [0u8; 1];
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::Timeout)));
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::Timeout)));
        assert_eq!(mock.read(&mut buffer).unwrap(), 1);
    }

    #[test]
    fn test_end_of_stream() {
        let mut mock = MockSerial::new();
        mock.push_readable(b">");
        mock.set_end_of_stream(true);

        let mut buffer = [0u8; 1];
        assert_eq!(mock.read(&mut buffer).unwrap(), 0);
        mock.set_end_of_stream(false);
        assert_eq!(mock.read(&mut buffer).unwrap(), 1);
    }

    #[test]
    fn test_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(matches!(mock.write(b"test"), Err(MockSerialError::SimulatedError)));
        assert!(matches!(mock.flush(), Err(MockSerialError::SimulatedError)));
        assert!(mock.written_data().is_empty());

        mock.push_readable(b"data");
        mock.set_read_error(true);
        let mut buffer = [0u8; 10];
        assert!(mock.read(&mut buffer).is_err());
        assert!(mock.bytes_available().is_err());

        mock.set_read_error(false);
        assert_eq!(mock.read(&mut buffer).unwrap(), 4);
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(MockSerialError::Timeout.kind(), embedded_io::ErrorKind::TimedOut));
        assert!(matches!(MockSerialError::NotFound.kind(), embedded_io::ErrorKind::NotFound));
        assert!(matches!(MockSerialError::SimulatedError.kind(), embedded_io::ErrorKind::Other));
        assert!(matches!(MockSerialError::Exhausted.kind(), embedded_io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_opener_finds_named_port() {
        let serial = MockSerial::new();
        let mut opener = MockOpener::new().with_port("COM3", serial.clone());

        assert!(matches!(
            opener.open("COM9", &LinkSettings::default()),
            Err(MockSerialError::NotFound)
        ));

        let mut channel = opener.open("COM3", &LinkSettings::default()).unwrap();
        assert!(serial.is_open());
        assert_eq!(opener.opened_with, [LinkSettings::default()]);

        channel.close().unwrap();
        assert!(!serial.is_open());
        assert_eq!(serial.close_count(), 1);
    }
}
