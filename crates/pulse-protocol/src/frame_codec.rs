//! Coordinate frame encoding/decoding and status classification.
//!
//! Framing model (fixed length, no header, no checksum):
//!
//! ```text
//! Coordinate frame (host → device), echo (device → host)
//! ------------------------------------------------------
//! [0] : x high byte
//! [1] : x low byte
//! [2] : y high byte
//! [3] : y low byte
//!
//! Decision (host → device)
//! ------------------------
//! [0] : 0xAA (ACK) or 0x55 (NAK)
//!
//! Status (device → host, polled)
//! ------------------------------
//! [0] : 0xFF / 0x00 / 0x11 / 0x22, anything else is Unknown
//! ```
//!
//! NOTE: the link is a raw byte stream. Nothing here can tell a stale
//! status byte from the first byte of an echo; keeping the two apart is
//! the session's job (it discards input before each expected response).

use std::fmt;

use crate::wire_types::{StatusCode, COORDINATE_MAX, FRAME_LEN};

/// Errors that can arise when encoding/decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A coordinate is negative or above 65535.
    Range { axis: &'static str, value: i64 },
    /// An echo did not contain exactly four bytes.
    Format { len: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Range { axis, value } => {
                write!(f, "{} coordinate {} out of range 0-{}", axis, value, COORDINATE_MAX)
            }
            CodecError::Format { len } => {
                write!(f, "echo has {} bytes, expected {}", len, FRAME_LEN)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// A coordinate frame exactly as it travels on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Build a frame from an already-validated pair. Infallible.
    pub fn from_pair(x: u16, y: u16) -> Self {
        let [x_hi, x_lo] = x.to_be_bytes();
        let [y_hi, y_lo] = y.to_be_bytes();
        Frame([x_hi, x_lo, y_hi, y_lo])
    }

    /// Wrap four raw bytes received from the device.
    pub fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Frame(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// The `(x, y)` pair carried by this frame.
    pub fn pair(&self) -> (u16, u16) {
        (
            u16::from_be_bytes([self.0[0], self.0[1]]),
            u16::from_be_bytes([self.0[2], self.0[3]]),
        )
    }
}

impl fmt::Display for Frame {
    /// Space separated upper-case hex, e.g. `00 64 00 C8`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex_bytes(&self.0))
    }
}

/// Encode a coordinate pair into a 4-byte big-endian frame.
///
/// Rejects values outside `0..=65535` even though callers normally hold
/// a validated coordinate already.
pub fn encode_coordinates(x: i64, y: i64) -> Result<Frame, CodecError> {
    let x = axis_value(x).ok_or(CodecError::Range { axis: "x", value: x })?;
    let y = axis_value(y).ok_or(CodecError::Range { axis: "y", value: y })?;
    Ok(Frame::from_pair(x, y))
}

/// Decode a device echo back into `(x, y)`.
///
/// The buffer must hold exactly [`FRAME_LEN`] bytes.
pub fn decode_echo(buf: &[u8]) -> Result<(u16, u16), CodecError> {
    let bytes: [u8; FRAME_LEN] = buf
        .try_into()
        .map_err(|_| CodecError::Format { len: buf.len() })?;
    Ok(Frame::from_bytes(bytes).pair())
}

/// Classify a single received byte against the status alphabet.
pub fn classify_status(byte: u8) -> StatusCode {
    StatusCode::from_u8(byte)
}

/// One coordinate axis as it goes on the wire, or `None` outside `0..=65535`.
pub fn axis_value(value: i64) -> Option<u16> {
    u16::try_from(value).ok()
}

/// Format bytes as space separated upper-case hex.
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
