//! Terminal classification of a cycle and the operator's decision.

use std::fmt;

use pulse_protocol::StatusCode;
use serde::Serialize;

/// The operator's answer after seeing the echo.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Decision {
    Ack,
    Nak,
}

impl Decision {
    /// The single byte sent to the device for this decision.
    pub fn status(self) -> StatusCode {
        match self {
            Decision::Ack => StatusCode::Ack,
            Decision::Nak => StatusCode::Nak,
        }
    }
}

/// Which wait expired.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    AwaitReady,
    PollCompletion,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::AwaitReady => write!(f, "ready signal"),
            Stage::PollCompletion => write!(f, "completion status"),
        }
    }
}

/// How a cycle ended. Every cycle ends in exactly one of these.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    /// Device reported `Success` after `Ack`.
    Completed,
    /// Operator sent `Nak`.
    Rejected,
    /// Device reported `Error` after `Ack`.
    DeviceError,
    /// A bounded wait expired.
    Timeout(Stage),
    /// Operator gave no decision, so nothing was sent.
    AbortedByOperator,
    /// The echo was incomplete and the operator gave no decision.
    MalformedEcho,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Rejected => write!(f, "rejected"),
            Outcome::DeviceError => write!(f, "device error"),
            Outcome::Timeout(stage) => write!(f, "timed out waiting for {}", stage),
            Outcome::AbortedByOperator => write!(f, "aborted by operator"),
            Outcome::MalformedEcho => write!(f, "malformed echo"),
        }
    }
}
