//! The byte channel the driver talks through.
//!
//! Reads and writes use [`embedded_io::Read`] and [`embedded_io::Write`]. A read
//! that returns `Ok(0)`, or fails with [`embedded_io::ErrorKind::TimedOut`] or
//! [`embedded_io::ErrorKind::Interrupted`], is taken to mean "nothing yet"; a
//! serial port configured with a read timeout behaves this way.

use embedded_io::ErrorType;

/// Parity setting of the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    Seven,
    #[default]
    Eight,
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// Serial link parameters. The default is what the Pantak HF75 expects: 9600 8N1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// An open, duplex byte stream to the emitter.
pub trait ByteChannel: embedded_io::Read + embedded_io::Write {
    /// Bytes that can be read right now without waiting.
    fn bytes_available(&mut self) -> Result<usize, Self::Error>;

    fn is_open(&self) -> bool {
        true
    }

    /// Release the underlying port. Called once, when the connection ends.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Opens byte channels by port name.
pub trait ChannelOpener {
    type Channel: ByteChannel;

    fn open(
        &mut self,
        port: &str,
        settings: &LinkSettings,
    ) -> Result<Self::Channel, <Self::Channel as ErrorType>::Error>;
}
