//! Validated coordinate pair.

use std::fmt;

use pulse_protocol::{axis_value, Frame};

use crate::error::CoordinateError;

/// An `(x, y)` pair, each in `0..=65535`.
///
/// Immutable once built; one is consumed per cycle to build a [`Frame`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    x: u16,
    y: u16,
}

impl Coordinate {
    /// Validate raw operator input.
    pub fn new(x: i64, y: i64) -> Result<Self, CoordinateError> {
        let x = axis_value(x).ok_or(CoordinateError { axis: "x", value: x })?;
        let y = axis_value(y).ok_or(CoordinateError { axis: "y", value: y })?;
        Ok(Self { x, y })
    }

    pub fn from_pair(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn from_frame(frame: &Frame) -> Self {
        let (x, y) = frame.pair();
        Self { x, y }
    }

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn y(&self) -> u16 {
        self.y
    }

    pub fn to_frame(&self) -> Frame {
        Frame::from_pair(self.x, self.y)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
