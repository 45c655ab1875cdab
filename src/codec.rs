//! Translation between commands and the bytes on the wire.
//!
//! Outbound frames are `<opcode><optional 4 digit value>\r`, where the value is
//! the quantity in tenths, zero padded. Inbound frames are any run of bytes
//! ended by [`RESPONSE_TERMINATOR`]; everything that is not an ASCII letter or
//! digit is line noise and is dropped from the payload.

use core::fmt::Write;

use thiserror::Error;

use crate::command::{COMMAND_TERMINATOR, Command, RESPONSE_TERMINATOR};

/// Longest outbound frame: 3 byte opcode, 4 digits, terminator.
pub const FRAME_CAPACITY: usize = 8;

/// Largest value the 4 digit payload field can hold, in tenths.
pub const PAYLOAD_MAX: u16 = 9999;

/// Encoded command, ready to write to the channel.
pub type Frame = heapless::String<FRAME_CAPACITY>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("Value does not fit the 4 digit payload field")]
    PayloadOutOfRange,
    #[error("Payload presence does not match the command")]
    PayloadMismatch,
    #[error("Frame does not fit the frame buffer")]
    FrameOverflow,
    #[error("Response exceeded the receive buffer")]
    ResponseOverflow,
}

/// Convert a quantity into the integer sent on the wire (tenths, rounded half to even).
pub fn scale_payload(value: f64) -> Result<u16, CodecError> {
    let scaled = (value * 10.0).round_ties_even();
    if !(0.0..=PAYLOAD_MAX as f64).contains(&scaled) {
        return Err(CodecError::PayloadOutOfRange);
    }
    Ok(scaled as u16)
}

/// `value` rounded half to even onto the tenths the payload field carries.
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// `value` rounded down to tenths.
pub fn floor_tenths(value: f64) -> f64 {
    (value * 10.0).floor() / 10.0
}

/// Encode `command` and its value, if it takes one, into a frame.
pub fn encode(command: Command, payload: Option<f64>) -> Result<Frame, CodecError> {
    let mut frame = Frame::new();
    frame
        .push_str(command.opcode())
        .map_err(|_| CodecError::FrameOverflow)?;

    match (command.takes_payload(), payload) {
        (true, Some(value)) => {
            let scaled = scale_payload(value)?;
            write!(frame, "{scaled:04}").map_err(|_| CodecError::FrameOverflow)?;
        }
        (false, None) => {}
        _ => return Err(CodecError::PayloadMismatch),
    }

    frame
        .push(char::from(COMMAND_TERMINATOR))
        .map_err(|_| CodecError::FrameOverflow)?;
    Ok(frame)
}

/// Frame command text that is not part of the [`Command`] table, such as the mode select.
pub fn encode_text(text: &str) -> Result<Frame, CodecError> {
    let mut frame = Frame::new();
    frame.push_str(text).map_err(|_| CodecError::FrameOverflow)?;
    frame
        .push(char::from(COMMAND_TERMINATOR))
        .map_err(|_| CodecError::FrameOverflow)?;
    Ok(frame)
}

/// Drop every byte that is not an ASCII letter or digit.
pub fn strip_noise(raw: &[u8]) -> String {
    raw.iter()
        .filter(|byte| byte.is_ascii_alphanumeric())
        .map(|&byte| char::from(byte))
        .collect()
}

/// Accumulates one response a byte at a time.
///
/// `L` bounds how many bytes may arrive before the terminator.
#[derive(Debug, Default)]
pub struct ResponseDecoder<const L: usize> {
    buffer: heapless::Vec<u8, L>,
}

impl<const L: usize> ResponseDecoder<L> {
    pub fn new() -> Self {
        Self {
            buffer: heapless::Vec::new(),
        }
    }

    /// Feed the next received byte.
    ///
    /// Returns the cleaned payload once `byte` is the response terminator. The
    /// terminator itself is never part of the payload or of [`Self::raw`].
    pub fn push(&mut self, byte: u8) -> Result<Option<String>, CodecError> {
        if byte == RESPONSE_TERMINATOR {
            return Ok(Some(strip_noise(&self.buffer)));
        }
        self.buffer
            .push(byte)
            .map_err(|_| CodecError::ResponseOverflow)?;
        Ok(None)
    }

    /// Bytes received so far, noise included.
    pub fn raw(&self) -> &[u8] {
        &self.buffer
    }
}
