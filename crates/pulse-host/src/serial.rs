//! Serial port transport.
//!
//! Wraps a `serialport` handle as a [`Transport`]. The port is opened
//! 8N1 with no flow control; closing happens when the value is dropped,
//! which covers normal exit, fatal errors and unwinding alike.

use std::io::{self, Read, Write};
use std::time::Duration;

use pulse_core::{Transport, TransportError};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::PortError;

/// Read timeout on the underlying handle. Reads are only issued once
/// bytes are known to be waiting, so this is a backstop.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

pub struct SerialTransport {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(name: &str, baud: u32) -> Result<Self, PortError> {
        let port = serialport::new(name, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| PortError::Open {
                name: name.to_string(),
                baud,
                source,
            })?;

        info!("opened {} at {} baud", name, baud);
        Ok(Self {
            name: name.to_string(),
            port,
        })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes).map_err(link_error)?;
        self.port.flush().map_err(link_error)?;
        debug!("wrote {} bytes to {}", bytes.len(), self.name);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        let n = self
            .port
            .bytes_to_read()
            .map_err(|e| link_error(e.into()))?;
        Ok(n as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(link_error(e)),
        }
    }

    fn discard_input_buffer(&mut self) -> Result<(), TransportError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| link_error(e.into()))
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        info!("serial connection to {} closed", self.name);
        let _ = writeln!(io::stdout(), "Serial connection closed.");
    }
}

fn link_error(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected
        | io::ErrorKind::UnexpectedEof => TransportError::Disconnected,
        _ => TransportError::Io(e),
    }
}
