//! Error types for the session core.
//!
//! Only transport failures are fatal to a run. Everything the device or
//! the operator can do wrong inside a cycle ends up as an
//! [`crate::Outcome`] instead of an error.

use std::io;

use thiserror::Error;

use crate::session::{Event, Phase};

/// Failure of the underlying byte link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Read/write/flush failed on the live line.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The endpoint went away (cable pulled, device reset).
    #[error("link disconnected")]
    Disconnected,
}

/// A coordinate outside `0..=65535`, caught before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{axis} coordinate {value} out of range 0-65535")]
pub struct CoordinateError {
    pub axis: &'static str,
    pub value: i64,
}

/// Conditions that stop a cycle without producing an outcome.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Fatal: ends the driver loop.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The coordinate source has nothing more to give.
    #[error("operator input closed")]
    InputClosed,

    /// A stop was requested (Ctrl-C) while the cycle was running.
    #[error("interrupted")]
    Interrupted,

    /// An event arrived that the current phase cannot accept.
    #[error("event {event:?} is not valid in phase {phase:?}")]
    InvalidTransition { phase: Phase, event: Event },
}

impl SessionError {
    /// `true` if the driver loop must stop with a failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Transport(_) | SessionError::InvalidTransition { .. })
    }
}
