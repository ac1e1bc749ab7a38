//! Low-level wire types and constants.
//!
//! This module defines:
//! - The single-byte status alphabet shared by host and firmware.
//! - The fixed coordinate frame length and coordinate range.
//!
//! The actual encode/decode logic lives in `frame_codec`.

use std::fmt;

/// Length of a coordinate frame on the wire: `[x_hi, x_lo, y_hi, y_lo]`.
pub const FRAME_LEN: usize = 4;

/// Largest value a single coordinate can carry (one big-endian `u16`).
pub const COORDINATE_MAX: i64 = u16::MAX as i64;

/// Status alphabet exchanged over the link.
///
/// Every byte maps to exactly one variant; bytes outside the alphabet
/// become [`StatusCode::Unknown`], which is not an error by itself.
///
/// `Ack` and `Nak` only travel host → device; the others are emitted
/// by the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Operation completed (0xFF).
    Success,

    /// Operation failed (0x00).
    Error,

    /// Host confirms the echoed frame, proceed (0xAA).
    Ack,

    /// Host rejects the echoed frame (0x55).
    Nak,

    /// Device is generating pulses (0x11).
    Generating,

    /// Device is idle and ready for a new frame (0x22).
    Waiting,

    /// Any byte outside the alphabet.
    Unknown(u8),
}

impl StatusCode {
    pub const SUCCESS: u8 = 0xFF;
    pub const ERROR: u8 = 0x00;
    pub const ACK: u8 = 0xAA;
    pub const NAK: u8 = 0x55;
    pub const GENERATING: u8 = 0x11;
    pub const WAITING: u8 = 0x22;

    /// Classify a raw byte. Total: unmatched bytes become `Unknown`.
    pub fn from_u8(v: u8) -> Self {
        match v {
            Self::SUCCESS => StatusCode::Success,
            Self::ERROR => StatusCode::Error,
            Self::ACK => StatusCode::Ack,
            Self::NAK => StatusCode::Nak,
            Self::GENERATING => StatusCode::Generating,
            Self::WAITING => StatusCode::Waiting,
            other => StatusCode::Unknown(other),
        }
    }

    /// The byte this status is sent as.
    pub fn as_u8(self) -> u8 {
        match self {
            StatusCode::Success => Self::SUCCESS,
            StatusCode::Error => Self::ERROR,
            StatusCode::Ack => Self::ACK,
            StatusCode::Nak => Self::NAK,
            StatusCode::Generating => Self::GENERATING,
            StatusCode::Waiting => Self::WAITING,
            StatusCode::Unknown(b) => b,
        }
    }

    /// `true` for every variant except `Unknown`.
    pub fn is_known(self) -> bool {
        !matches!(self, StatusCode::Unknown(_))
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Success => write!(f, "SUCCESS"),
            StatusCode::Error => write!(f, "ERROR"),
            StatusCode::Ack => write!(f, "ACK"),
            StatusCode::Nak => write!(f, "NAK"),
            StatusCode::Generating => write!(f, "GENERATING"),
            StatusCode::Waiting => write!(f, "WAITING"),
            StatusCode::Unknown(b) => write!(f, "Unknown (0x{:02X})", b),
        }
    }
}
