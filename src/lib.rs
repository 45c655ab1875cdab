//! This crate provides a driver for the Pantak HF75 X-ray emitter over its serial interface.
//!
//! The emitter speaks a line protocol: each command is a short opcode, optionally
//! followed by a 4 digit value in tenths, ended with `\r`. Every command gets
//! exactly one response, ended with `>`. Focus operation is not supported.
//!
//! The serial port used for emitter comms should be configured like so:
//! * Baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! The port itself is supplied through [`channel::ChannelOpener`], so any
//! transport implementing [`embedded_io::Read`] and [`embedded_io::Write`] can
//! be used. See `demos/serial.rs` for one built on the `serialport` crate.
//!
//! __Warning:__ [`driver::PantakDriver::start_emitting`] turns on X-ray emission.
//! Current is clamped to the tube's power rating, but nothing else about the
//! installation is checked.

pub mod channel;
pub mod codec;
pub mod command;
pub mod driver;
pub mod error;
pub mod interlock;
pub mod safety;
pub mod shared;
pub mod trace;

#[cfg(test)]
mod mock_serial;
