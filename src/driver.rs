use embedded_io::{ErrorKind, ErrorType, Read as _, Write as _};

use crate::{
    channel::{ByteChannel, ChannelOpener, LinkSettings},
    codec::{self, CodecError, Frame, ResponseDecoder},
    command::{Command, FAULT_MARKER, MODE_SELECT, RESET},
    error::{Error, Result},
    interlock::InterlockStatus,
    safety::{self, DeviceRating},
    trace::{TraceSink, Tracer, TracingSink},
};

/// Returned by voltage and current readings when the response was garbled.
pub const GARBLED_READING: f64 = -1.0;

type ChannelError<O> = <<O as ChannelOpener>::Channel as ErrorType>::Error;

/// Where the driver is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Port open, reset and mode select in progress.
    Connecting,
    Connected,
}

/// Driver configuration. The default suits a Pantak HF75 on a 9600 8N1 link
/// with tracing on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PantakConfig {
    pub link: LinkSettings,
    pub rating: DeviceRating,
    pub trace_enabled: bool,
}

impl Default for PantakConfig {
    fn default() -> Self {
        Self {
            link: LinkSettings::default(),
            rating: DeviceRating::HF75,
            trace_enabled: true,
        }
    }
}

/// Serial driver for the Pantak HF75 X-ray emitter.
///
/// You can create a driver from any [`ChannelOpener`]; the channel it opens is
/// owned by the driver until [`Self::disconnect`]. Every command is followed by
/// exactly one response, read a byte at a time until the `>` terminator, before
/// the next command is sent. There is no read timeout at this layer.
///
/// Method names starting with "read" query the emitter on every call; nothing is
/// cached. Dropping the driver disconnects it, which stops emission first.
///
/// `L` bounds the length of a single response.
pub struct PantakDriver<O: ChannelOpener, const L: usize = 128> {
    opener: O,
    channel: Option<O::Channel>,
    state: ConnectionState,
    config: PantakConfig,
    tracer: Tracer,
}

impl<O: ChannelOpener, const L: usize> PantakDriver<O, L> {
    /// Create a disconnected driver with the default configuration.
    pub fn new(opener: O) -> Self {
        Self::with_config(opener, PantakConfig::default())
    }

    pub fn with_config(opener: O, config: PantakConfig) -> Self {
        Self {
            opener,
            channel: None,
            state: ConnectionState::Disconnected,
            config,
            tracer: Tracer::new(config.trace_enabled, Box::new(TracingSink)),
        }
    }

    /// Replace the trace sink. The default is [`TracingSink`].
    pub fn with_sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    pub fn set_sink(&mut self, sink: impl TraceSink + 'static) {
        self.tracer.set_sink(Box::new(sink));
    }

    /// Turns on trace output from this driver.
    pub fn enable_trace(&mut self) {
        self.tracer.set_enabled(true);
    }

    /// Turns off trace output from this driver.
    pub fn disable_trace(&mut self) {
        self.tracer.set_enabled(false);
    }

    pub fn trace_enabled(&self) -> bool {
        self.tracer.is_enabled()
    }

    pub fn config(&self) -> &PantakConfig {
        &self.config
    }

    /// Maximum voltage, in kilovolts, the emitter can be set to.
    pub fn max_kv(&self) -> f64 {
        self.config.rating.max_kv
    }

    /// Maximum power, in watts, the tube may dissipate.
    pub fn max_watts(&self) -> f64 {
        self.config.rating.max_watts
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a channel is held and still open.
    pub fn is_connected(&self) -> bool {
        self.channel
            .as_ref()
            .is_some_and(|channel| channel.is_open())
    }

    /// Connect to the emitter on `port`.
    ///
    /// Any existing connection is torn down first. After the port opens the
    /// emitter is reset and switched to ASCII mode; if that fails the port is
    /// closed again.
    pub fn connect(&mut self, port: &str) -> Result<(), ChannelError<O>> {
        // Don't leave the current port locked up.
        self.disconnect();

        self.state = ConnectionState::Connecting;
        self.tracer.log(format_args!("Opening port..."));
        let channel = match self.opener.open(port, &self.config.link) {
            Ok(channel) => channel,
            Err(cause) => {
                self.state = ConnectionState::Disconnected;
                return Err(Error::PortUnavailable {
                    port: port.to_string(),
                    cause,
                });
            }
        };
        self.tracer.log(format_args!("Port open"));
        self.channel = Some(channel);

        if let Err(err) = self.handshake() {
            self.close_channel();
            return Err(err);
        }

        self.state = ConnectionState::Connected;
        tracing::debug!(port, "Connected to Pantak HF75");
        Ok(())
    }

    /// Disconnect from the emitter.
    ///
    /// Emission is stopped before the port closes. A failure to stop is logged
    /// and otherwise ignored; the port is always closed.
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            // Never leave the tube emitting once nothing is controlling it.
            if let Err(err) = self.stop_emitting() {
                tracing::warn!(error = %err, "Failed to stop emission while disconnecting");
            }
        }
        self.close_channel();
    }

    /// Return the measured output voltage in kilovolts.
    ///
    /// Below 1kV while not emitting. [`GARBLED_READING`] if the response was not
    /// 4 digits.
    pub fn read_voltage_kv(&mut self) -> Result<f64, ChannelError<O>> {
        let payload = self.send_command(Command::GetVolts, None)?;
        Ok(parse_tenths(&payload))
    }

    /// Return the measured output current in milliamps.
    ///
    /// Below 1mA while not emitting. [`GARBLED_READING`] if the response was not
    /// 4 digits.
    pub fn read_current_ma(&mut self) -> Result<f64, ChannelError<O>> {
        let payload = self.send_command(Command::GetAmps, None)?;
        Ok(parse_tenths(&payload))
    }

    /// Read whether X-rays are being emitted. Unexpected responses read as not emitting.
    pub fn read_emitting(&mut self) -> Result<bool, ChannelError<O>> {
        let payload = self.send_command(Command::GetOnOff, None)?;
        // 0 is emitting, 1 is not.
        Ok(payload == "0")
    }

    /// Read whether the tube is warmed up. Unexpected responses read as not warmed up.
    pub fn read_warmed_up(&mut self) -> Result<bool, ChannelError<O>> {
        let payload = self.send_command(Command::GetWarmedUp, None)?;
        // 0 needs a warm-up, 1 is warmed up.
        Ok(payload == "1")
    }

    /// Read the fault state of every interlock.
    pub fn read_interlocks(&mut self) -> Result<InterlockStatus, ChannelError<O>> {
        let payload = self.send_command(Command::GetInterlocks, None)?;
        Ok(InterlockStatus::from_payload(&payload))
    }

    /// Comma separated names of the interlocks currently in fault.
    pub fn read_interlock_error_text(&mut self) -> Result<String, ChannelError<O>> {
        Ok(self.read_interlocks()?.error_text())
    }

    /// Tell the emitter a warm-up is not required.
    pub fn override_warmup(&mut self) -> Result<(), ChannelError<O>> {
        self.send_command(Command::OverrideWarmup, None)?;
        Ok(())
    }

    /// Set the target voltage and current without starting emission.
    ///
    /// The current is clamped to what the power rating allows at `kv`. Voltage
    /// and current are separate exchanges; if the second fails the new voltage
    /// stays set.
    pub fn set_voltage_and_current(&mut self, kv: f64, ma: f64) -> Result<(), ChannelError<O>> {
        let (volts, amps) = self.setting_frames(kv, ma)?;
        self.send_frame(volts.as_bytes())?;
        self.send_frame(amps.as_bytes())?;
        Ok(())
    }

    /// Turn on X-ray emission at `kv` and `ma`.
    ///
    /// Settings that would exceed the power rating have their current lowered
    /// to the maximum allowed.
    pub fn start_emitting(&mut self, kv: f64, ma: f64) -> Result<(), ChannelError<O>> {
        self.set_voltage_and_current(kv, ma)?;
        self.send_command(Command::StartEmitting, None)?;
        Ok(())
    }

    /// Turn off X-ray emission.
    pub fn stop_emitting(&mut self) -> Result<(), ChannelError<O>> {
        self.send_command(Command::StopEmitting, None)?;
        Ok(())
    }

    /// Validate and clamp settings, then encode both frames so that nothing is
    /// sent unless all of them are valid.
    fn setting_frames(&mut self, kv: f64, ma: f64) -> Result<(Frame, Frame), ChannelError<O>> {
        if kv.is_nan() || kv < 0.0 {
            return Err(Error::InvalidParameter("kV must be 0 or more"));
        }
        if ma.is_nan() || ma < 0.0 {
            return Err(Error::InvalidParameter("mA must be 0 or more"));
        }
        let rating = self.config.rating;

        // Clamp against the values the emitter will actually be sent.
        let kv = codec::round_tenths(kv);
        let requested_ma = codec::round_tenths(ma);
        let mut sent_ma = safety::clamp_current(kv, requested_ma, rating.max_watts);
        if sent_ma != requested_ma {
            sent_ma = codec::floor_tenths(sent_ma);
            self.tracer.log(format_args!(
                "Requested milliamps {ma:?} exceeds max milliamps {:?}",
                rating.max_current_ma(kv)
            ));
        }

        let volts = codec::encode(Command::SetVolts, Some(kv))?;
        let amps = codec::encode(Command::SetAmps, Some(sent_ma))?;
        Ok((volts, amps))
    }

    /// Reset the emitter and put it in ASCII mode.
    fn handshake(&mut self) -> Result<(), ChannelError<O>> {
        self.send_frame(&[RESET])?;
        let mode = codec::encode_text(MODE_SELECT)?;
        self.send_frame(mode.as_bytes())?;
        Ok(())
    }

    fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(err) = channel.close() {
                tracing::warn!(?err, "Failed to close port");
            }
        }
        self.state = ConnectionState::Disconnected;
    }

    fn send_command(
        &mut self,
        command: Command,
        payload: Option<f64>,
    ) -> Result<String, ChannelError<O>> {
        let frame = codec::encode(command, payload)?;
        self.send_frame(frame.as_bytes())
    }

    /// Write one frame and block until its response has been read.
    fn send_frame(&mut self, frame: &[u8]) -> Result<String, ChannelError<O>> {
        let channel = self.channel.as_mut().ok_or(Error::NotConnected)?;
        self.tracer
            .log(format_args!("SEND | {}", String::from_utf8_lossy(frame)));

        channel.write_all(frame).map_err(Error::Serial)?;
        channel.flush().map_err(Error::Serial)?;
        Self::await_response(channel, &mut self.tracer)
    }

    /// Read until the response terminator and return the cleaned payload.
    ///
    /// Read timeouts are waited through. A read of no bytes is end of stream.
    fn await_response(
        channel: &mut O::Channel,
        tracer: &mut Tracer,
    ) -> Result<String, ChannelError<O>> {
        let mut decoder = ResponseDecoder::<L>::new();
        let mut overflowed = false;
        let mut byte = [0u8; 1];
        loop {
            match channel.read(&mut byte) {
                Ok(0) => return Err(Error::ChannelClosed),
                Ok(_) => match decoder.push(byte[0]) {
                    Ok(None) => {}
                    Ok(Some(payload)) => {
                        tracer.log(format_args!(
                            "RECV | {}",
                            String::from_utf8_lossy(decoder.raw())
                        ));
                        Self::drain_trailing(channel, tracer)?;
                        if overflowed {
                            return Err(Error::ResponseOverflow);
                        }
                        return Ok(payload);
                    }
                    // The rest of the response is still consumed, up to its
                    // terminator, so the next exchange starts clean.
                    Err(CodecError::ResponseOverflow) => {
                        if !overflowed {
                            tracing::warn!(capacity = L, "Response overflowed the receive buffer");
                        }
                        overflowed = true;
                    }
                    Err(err) => return Err(err.into()),
                },
                Err(err) if is_idle(&err) => continue,
                Err(err) => return Err(Error::Serial(err)),
            }
        }
    }

    /// Nothing should follow a response. Whatever does is consumed, and if it
    /// carries the fault marker the exchange failed.
    fn drain_trailing(channel: &mut O::Channel, tracer: &mut Tracer) -> Result<(), ChannelError<O>> {
        let available = channel.bytes_available().map_err(Error::Serial)?;
        if available == 0 {
            return Ok(());
        }
        tracer.log(format_args!("{available} bytes remaining in stream"));

        let mut trailing = vec![0u8; available];
        let mut filled = 0;
        while filled < available {
            match channel.read(&mut trailing[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(err) if is_idle(&err) => break,
                Err(err) => return Err(Error::Serial(err)),
            }
        }

        let text = String::from_utf8_lossy(&trailing[..filled]);
        tracer.log(format_args!("{text}"));
        if text.contains(FAULT_MARKER) {
            return Err(Error::CommunicationFault);
        }
        Ok(())
    }
}

impl<O: ChannelOpener, const L: usize> Drop for PantakDriver<O, L> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// A read that produced nothing yet rather than a broken channel.
fn is_idle<E: embedded_io::Error>(err: &E) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted)
}

/// Four digits in tenths, or [`GARBLED_READING`].
fn parse_tenths(payload: &str) -> f64 {
    if payload.len() != 4 {
        return GARBLED_READING;
    }
    payload
        .parse::<u16>()
        .map_or(GARBLED_READING, |tenths| f64::from(tenths) / 10.0)
}
