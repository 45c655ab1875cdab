//! This module defines the command set understood by the Pantak HF75 and the
//! fixed bytes framing every exchange.

use strum_macros::EnumIter;

/// Appended to every outbound command.
pub const COMMAND_TERMINATOR: u8 = b'\r';

/// Ends every response from the emitter. ASCII `>`.
pub const RESPONSE_TERMINATOR: u8 = 0x3E;

/// ESC, resets the emitter's command interpreter. Sent raw, without a terminator.
pub const RESET: u8 = 0x1B;

/// Switches the emitter into ASCII communication mode.
pub const MODE_SELECT: &str = "A";

/// Text the emitter sends after a response when it could not parse the command.
pub const FAULT_MARKER: &str = "COMMUNICATION ERROR";

/// Commands supported by the Pantak HF75.
///
/// Focus operation is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Command {
    /// __Q__ - Measured output kilovolts, 4 digits in tenths.
    GetVolts,
    /// __Q__ - Measured output milliamps, 4 digits in tenths.
    GetAmps,
    /// __Q__ - Emission state.
    /// * `0` - Emitting.
    /// * `1` - Not emitting.
    GetOnOff,
    /// __Q__ - Warm-up state.
    /// * `0` - Warm-up required.
    /// * `1` - Warmed up.
    GetWarmedUp,
    /// __Q__ - 9 interlock status characters.
    ///
    /// See [`Interlock`](crate::interlock::Interlock) for their order.
    GetInterlocks,
    /// __S__ - Target kilovolts, 4 digits in tenths. E.g. 10kV => `0100`.
    SetVolts,
    /// __S__ - Target milliamps, 4 digits in tenths. E.g. 4.5mA => `0045`.
    SetAmps,
    /// __S__ - Turn X-ray emission on.
    StartEmitting,
    /// __S__ - Turn X-ray emission off.
    StopEmitting,
    /// __S__ - Trips a firmware flag so no warm-up period is forced.
    OverrideWarmup,
}

impl Command {
    /// The opcode transmitted for this command.
    pub const fn opcode(self) -> &'static str {
        match self {
            Command::GetVolts => "v",
            Command::GetAmps => "m",
            Command::GetOnOff => "s",
            Command::GetWarmedUp => "w",
            Command::GetInterlocks => "i",
            Command::SetVolts => "V",
            Command::SetAmps => "M",
            Command::StartEmitting => "S",
            Command::StopEmitting => "E",
            Command::OverrideWarmup => "911",
        }
    }

    /// Whether this command carries a numeric value after its opcode.
    pub const fn takes_payload(self) -> bool {
        matches!(self, Command::SetVolts | Command::SetAmps)
    }
}

impl From<Command> for &'static str {
    fn from(value: Command) -> Self {
        value.opcode()
    }
}
