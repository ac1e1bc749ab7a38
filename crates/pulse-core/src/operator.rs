//! Collaborator interfaces: where coordinates and decisions come from,
//! and where progress goes.
//!
//! The core never talks to a terminal. A host plugs in interactive
//! prompts, a batch list, or a test script through these traits.

use std::collections::VecDeque;

use pulse_protocol::{Frame, StatusCode};

use crate::coordinate::Coordinate;
use crate::outcome::{Decision, Outcome};
use crate::session::Echo;

/// One answer from a [`CoordinateSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinateInput {
    Valid(Coordinate),
    /// Rejected before anything is sent; the runner asks again.
    Invalid(String),
    /// No more input. Ends the run cleanly.
    EndOfInput,
}

pub trait CoordinateSource {
    fn next_coordinate(&mut self) -> CoordinateInput;
}

pub trait DecisionSource {
    /// Asked when the ready wait ran out. `true` proceeds without it.
    fn continue_without_ready(&mut self) -> bool;

    /// Ack, Nak, or `None` to send nothing.
    fn decide(&mut self, sent: &Coordinate, echo: &Echo) -> Option<Decision>;

    /// Asked between cycles. `false` ends the run.
    fn proceed_to_next_cycle(&mut self) -> bool {
        true
    }

    /// The operator's input has ended. Checked after every cycle; the
    /// run stops as if the next coordinate request had hit end of input.
    fn input_closed(&self) -> bool {
        false
    }
}

/// Progress notifications. Purely observational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new cycle started waiting for the device.
    AwaitingReady,
    Ready,
    /// A non-`Waiting` byte seen while waiting for ready.
    StrayStatus(StatusCode),
    ReadyMissing,
    InvalidCoordinate(String),
    FrameSent { coordinate: Coordinate, frame: Frame },
    Echoed { sent: Coordinate, echo: Frame },
    EchoMissing { received: Vec<u8> },
    DecisionSent(Decision),
    NoDecision,
    Generating,
    UnknownStatus(u8),
    NoResponse,
    Finished(Outcome),
}

pub trait StatusSink {
    fn notify(&mut self, event: &SessionEvent);
}

/// Pairs an independent coordinate source with a decision source.
#[derive(Debug, Clone)]
pub struct Operator<C, D> {
    pub coordinates: C,
    pub decisions: D,
}

impl<C, D> Operator<C, D> {
    pub fn new(coordinates: C, decisions: D) -> Self {
        Self { coordinates, decisions }
    }
}

impl<C: CoordinateSource, D> CoordinateSource for Operator<C, D> {
    fn next_coordinate(&mut self) -> CoordinateInput {
        self.coordinates.next_coordinate()
    }
}

impl<C, D: DecisionSource> DecisionSource for Operator<C, D> {
    fn continue_without_ready(&mut self) -> bool {
        self.decisions.continue_without_ready()
    }

    fn decide(&mut self, sent: &Coordinate, echo: &Echo) -> Option<Decision> {
        self.decisions.decide(sent, echo)
    }

    fn proceed_to_next_cycle(&mut self) -> bool {
        self.decisions.proceed_to_next_cycle()
    }

    fn input_closed(&self) -> bool {
        self.decisions.input_closed()
    }
}

/// Coordinates from a fixed list, ending the run when it runs out.
#[derive(Debug, Clone, Default)]
pub struct BatchCoordinates {
    queue: VecDeque<Coordinate>,
}

impl BatchCoordinates {
    pub fn new(coordinates: impl IntoIterator<Item = Coordinate>) -> Self {
        Self {
            queue: coordinates.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl CoordinateSource for BatchCoordinates {
    fn next_coordinate(&mut self) -> CoordinateInput {
        match self.queue.pop_front() {
            Some(c) => CoordinateInput::Valid(c),
            None => CoordinateInput::EndOfInput,
        }
    }
}

/// Same answer every time. Used for unattended runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision {
    pub decision: Option<Decision>,
    pub override_ready: bool,
}

impl FixedDecision {
    pub fn new(decision: Option<Decision>, override_ready: bool) -> Self {
        Self { decision, override_ready }
    }
}

impl DecisionSource for FixedDecision {
    fn continue_without_ready(&mut self) -> bool {
        self.override_ready
    }

    fn decide(&mut self, _sent: &Coordinate, _echo: &Echo) -> Option<Decision> {
        self.decision
    }
}
