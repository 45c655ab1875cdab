//! Our error types for the Pantak HF75 driver.

use thiserror::Error;

use crate::codec::CodecError;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for Pantak HF75 communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    Serial(I),
    #[error("Port {port} could not be opened")]
    PortUnavailable { port: String, cause: I },
    #[error("Pantak returned generic error")]
    CommunicationFault,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("Not connected")]
    NotConnected,
    #[error("Response exceeded the receive buffer before a terminator arrived")]
    ResponseOverflow,
    #[error("Port reached end of stream while awaiting a response")]
    ChannelClosed,
}

impl<I: embedded_io::Error> From<CodecError> for Error<I> {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::PayloadOutOfRange => {
                Error::InvalidParameter("value does not fit the 4 digit payload field")
            }
            CodecError::PayloadMismatch => {
                Error::InvalidParameter("payload presence does not match the command")
            }
            CodecError::FrameOverflow => Error::InvalidParameter("command text is too long"),
            CodecError::ResponseOverflow => Error::ResponseOverflow,
        }
    }
}
