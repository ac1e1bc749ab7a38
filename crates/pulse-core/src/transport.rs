//! Byte-stream transport abstraction.
//!
//! A transport is a duplex byte channel already bound to an endpoint and
//! a bit rate. It knows nothing about frames or status codes and never
//! retries; retry and timeout policy belongs to the session runner.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::clock::Clock;
use crate::error::TransportError;

pub trait Transport {
    /// Write all of `bytes` to the line.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> Result<usize, TransportError>;

    /// Read up to `buf.len()` already-available bytes. Must not block
    /// waiting for more; returns the number of bytes copied.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Drop every byte received but not yet read.
    fn discard_input_buffer(&mut self) -> Result<(), TransportError>;

    /// Read a single byte if one is waiting.
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        if self.bytes_available()? == 0 {
            return Ok(None);
        }
        let mut buf = [0u8; 1];
        match self.read_available(&mut buf)? {
            0 => Ok(None),
            _ => {
                trace!("read byte 0x{:02X}", buf[0]);
                Ok(Some(buf[0]))
            }
        }
    }

    /// Accumulate up to `n` bytes, polling every `poll` until `deadline`.
    ///
    /// Never blocks past the deadline. The result may be shorter than
    /// `n`; the caller inspects its length to detect a timeout.
    fn read_exact_with_deadline(
        &mut self,
        n: usize,
        deadline: Instant,
        poll: Duration,
        clock: &dyn Clock,
    ) -> Result<Vec<u8>, TransportError> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let available = self.bytes_available()?;
            if available > 0 {
                let want = available.min(n - out.len());
                let mut chunk = vec![0u8; want];
                let got = self.read_available(&mut chunk)?;
                out.extend_from_slice(&chunk[..got]);
                if out.len() == n {
                    break;
                }
            }
            if clock.now() >= deadline {
                break;
            }
            clock.sleep(poll);
        }
        Ok(out)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).read_available(buf)
    }

    fn discard_input_buffer(&mut self) -> Result<(), TransportError> {
        (**self).discard_input_buffer()
    }
}
