use std::env;
use std::time::Duration;

use pantak_hf75::channel::{ByteChannel, ChannelOpener, DataBits, LinkSettings, Parity, StopBits};
use pantak_hf75::driver::PantakDriver;
use serialport::SerialPort;

// The emitter answers every command, but a read timeout keeps the driver from
// spinning while it waits.
const SERIAL_TIMEOUT_MS: u64 = 100;
const EMISSION_TIME_MS: u64 = 5000;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serialport::Error> for IoError {
    fn from(err: serialport::Error) -> Self {
        IoError(err.into())
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

// The port is released when the wrapper is dropped.
impl ByteChannel for PortWrapper {
    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.0.bytes_to_read()? as usize)
    }
}

/// Opens ports by name with the `serialport` crate.
pub struct SerialOpener;

impl ChannelOpener for SerialOpener {
    type Channel = PortWrapper;

    fn open(&mut self, port: &str, settings: &LinkSettings) -> Result<PortWrapper, IoError> {
        let data_bits = match settings.data_bits {
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        };
        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };
        let stop_bits = match settings.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        };

        let port = serialport::new(port, settings.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
            .open()?;
        Ok(PortWrapper(port))
    }
}

fn main() {
    tracing_subscriber::fmt().init();

    // Usage: serial <port> [kV mA]
    let mut args = env::args().skip(1);
    let Some(port_name) = args.next() else {
        eprintln!("Usage: serial <port> [kV mA]");
        std::process::exit(1);
    };
    let emission: Option<(f64, f64)> = match (args.next(), args.next()) {
        (Some(kv), Some(ma)) => Some((
            kv.parse().expect("kV must be a number"),
            ma.parse().expect("mA must be a number"),
        )),
        _ => None,
    };

    let mut emitter: PantakDriver<SerialOpener> = PantakDriver::new(SerialOpener);
    emitter.connect(&port_name).expect("Failed to connect");
    println!("Connected to {}", port_name);

    println!("Warmed up: {}", emitter.read_warmed_up().unwrap());
    let interlocks = emitter.read_interlocks().unwrap();
    if interlocks.is_all_clear() {
        println!("Interlocks: all clear");
    } else {
        println!("Interlocks in fault: {}", interlocks.error_text());
    }

    if let Some((kv, ma)) = emission {
        println!("Emitting at {}kV {}mA for {}ms", kv, ma, EMISSION_TIME_MS);
        emitter.start_emitting(kv, ma).unwrap();
        std::thread::sleep(Duration::from_millis(EMISSION_TIME_MS));
    }

    println!("Emitting: {}", emitter.read_emitting().unwrap());
    println!("Output: {}kV {}mA", emitter.read_voltage_kv().unwrap(), emitter.read_current_ma().unwrap());

    // Stops emission before the port is released.
    emitter.disconnect();
    println!("Disconnected");
}
