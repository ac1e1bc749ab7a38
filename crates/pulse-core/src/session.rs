//! Session phases and the pure transition function.
//!
//! A cycle walks these phases in order, with early exits:
//!
//! ```text
//! AwaitReady ──ready──▶ SubmitCoordinates ──sent──▶ AwaitEcho ──▶ ObtainDecision
//!     │                        ▲                                   │        │
//!  exhausted                granted                              none     Ack/Nak
//!     ▼                        │                                   ▼        ▼
//! OperatorOverride ────────────┘                             Finished   SendDecision
//!     │ declined                                                  ▲     │       │
//!     └──────────────▶ Finished(Timeout(AwaitReady))              │    Nak     Ack
//!                                                                 │     ▼       ▼
//!                                                   Finished(Rejected)  PollCompletion
//!                                                                  Success / Error / deadline
//! ```
//!
//! [`next_phase`] holds all of the ordering rules and does no I/O.
//! [`Session`] records what each event carried. The effectful side lives
//! in [`crate::runner`].

use pulse_protocol::{Frame, StatusCode};
use tracing::debug;

use crate::coordinate::Coordinate;
use crate::error::SessionError;
use crate::outcome::{Decision, Outcome, Stage};

/// Where a session currently is.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Polling for the device's `Waiting` byte.
    AwaitReady,
    /// Ready wait exhausted; asking the operator whether to go on.
    OperatorOverride,
    /// Fetching a coordinate and writing its frame.
    SubmitCoordinates,
    /// Accumulating the 4-byte echo of the coordinate just sent.
    AwaitEcho(Coordinate),
    /// Asking the operator for Ack / Nak / nothing about what was sent.
    ObtainDecision(Coordinate),
    /// Writing the decision byte.
    SendDecision(Decision),
    /// Polling for `Success` / `Error` after `Ack`.
    PollCompletion,
    /// Terminal.
    Finished(Outcome),
}

/// What the runner observed while performing a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ReadyObserved,
    ReadyExhausted,
    OverrideGranted,
    OverrideDeclined,
    FrameSent(Coordinate),
    EchoReceived(Frame),
    /// Fewer than four bytes arrived before the echo deadline.
    EchoIncomplete(Vec<u8>),
    DecisionMade(Option<Decision>),
    DecisionSent(Decision),
    /// A terminal status byte (`Success` or `Error`) after `Ack`.
    CompletionReported(StatusCode),
    CompletionTimedOut,
}

/// The echo as recorded by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Echo {
    Received(Frame),
    /// Whatever arrived before the deadline (possibly nothing).
    Incomplete(Vec<u8>),
}

impl Echo {
    pub fn is_complete(&self) -> bool {
        matches!(self, Echo::Received(_))
    }

    /// The echoed pair, if the echo was complete.
    pub fn pair(&self) -> Option<(u16, u16)> {
        match self {
            Echo::Received(frame) => Some(frame.pair()),
            Echo::Incomplete(_) => None,
        }
    }

    /// `true` if the echo carries exactly `sent`.
    pub fn matches(&self, sent: &Coordinate) -> bool {
        self.pair() == Some((sent.x(), sent.y()))
    }
}

/// Next phase for `event` in `phase`, or `None` if the event is illegal there.
///
/// `echo_complete` only matters when the operator gives no decision: an
/// incomplete echo then ends the cycle as `MalformedEcho`.
pub fn next_phase(phase: Phase, event: &Event, echo_complete: bool) -> Option<Phase> {
    let next = match (phase, event) {
        (Phase::AwaitReady, Event::ReadyObserved) => Phase::SubmitCoordinates,
        (Phase::AwaitReady, Event::ReadyExhausted) => Phase::OperatorOverride,

        (Phase::OperatorOverride, Event::OverrideGranted) => Phase::SubmitCoordinates,
        (Phase::OperatorOverride, Event::OverrideDeclined) => {
            Phase::Finished(Outcome::Timeout(Stage::AwaitReady))
        }

        (Phase::SubmitCoordinates, Event::FrameSent(sent)) => Phase::AwaitEcho(*sent),

        (Phase::AwaitEcho(sent), Event::EchoReceived(_)) => Phase::ObtainDecision(sent),
        (Phase::AwaitEcho(sent), Event::EchoIncomplete(_)) => Phase::ObtainDecision(sent),

        (Phase::ObtainDecision(_), Event::DecisionMade(Some(decision))) => {
            Phase::SendDecision(*decision)
        }
        (Phase::ObtainDecision(_), Event::DecisionMade(None)) if echo_complete => {
            Phase::Finished(Outcome::AbortedByOperator)
        }
        (Phase::ObtainDecision(_), Event::DecisionMade(None)) => {
            Phase::Finished(Outcome::MalformedEcho)
        }

        (Phase::SendDecision(expected), Event::DecisionSent(sent)) if expected == *sent => {
            match sent {
                Decision::Nak => Phase::Finished(Outcome::Rejected),
                Decision::Ack => Phase::PollCompletion,
            }
        }

        (Phase::PollCompletion, Event::CompletionReported(StatusCode::Success)) => {
            Phase::Finished(Outcome::Completed)
        }
        (Phase::PollCompletion, Event::CompletionReported(StatusCode::Error)) => {
            Phase::Finished(Outcome::DeviceError)
        }
        (Phase::PollCompletion, Event::CompletionTimedOut) => {
            Phase::Finished(Outcome::Timeout(Stage::PollCompletion))
        }

        _ => return None,
    };
    Some(next)
}

/// One request cycle. Created per cycle and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    phase: Phase,
    ready_observed: bool,
    coordinate: Option<Coordinate>,
    echo: Option<Echo>,
    decision: Option<Decision>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitReady,
            ready_observed: false,
            coordinate: None,
            echo: None,
            decision: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// `true` if the device signalled `Waiting` (no override was needed).
    pub fn ready_observed(&self) -> bool {
        self.ready_observed
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn echo(&self) -> Option<&Echo> {
        self.echo.as_ref()
    }

    /// `true` once an echo wait ended with fewer than four bytes.
    pub fn echo_malformed(&self) -> bool {
        matches!(self.echo, Some(Echo::Incomplete(_)))
    }

    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Record `event` and advance to the next phase.
    pub fn apply(&mut self, event: Event) -> Result<Phase, SessionError> {
        let next = next_phase(self.phase, &event, !self.echo_malformed()).ok_or_else(|| {
            SessionError::InvalidTransition {
                phase: self.phase,
                event: event.clone(),
            }
        })?;

        match event {
            Event::ReadyObserved => self.ready_observed = true,
            Event::FrameSent(coordinate) => self.coordinate = Some(coordinate),
            Event::EchoReceived(frame) => self.echo = Some(Echo::Received(frame)),
            Event::EchoIncomplete(bytes) => self.echo = Some(Echo::Incomplete(bytes)),
            Event::DecisionMade(decision) => self.decision = decision,
            _ => {}
        }

        debug!("session phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(events: Vec<Event>) -> Session {
        let mut session = Session::new();
        for event in events {
            session.apply(event).unwrap();
        }
        session
    }

    #[test]
    fn happy_path_completes() {
        let c = Coordinate::from_pair(100, 200);
        let session = drive(vec![
            Event::ReadyObserved,
            Event::FrameSent(c),
            Event::EchoReceived(c.to_frame()),
            Event::DecisionMade(Some(Decision::Ack)),
            Event::DecisionSent(Decision::Ack),
            Event::CompletionReported(StatusCode::Success),
        ]);
        assert_eq!(session.outcome(), Some(Outcome::Completed));
        assert!(session.ready_observed());
        assert!(session.echo().unwrap().matches(&c));
    }

    #[test]
    fn nak_ends_rejected() {
        let c = Coordinate::from_pair(1, 2);
        let session = drive(vec![
            Event::ReadyObserved,
            Event::FrameSent(c),
            Event::EchoReceived(c.to_frame()),
            Event::DecisionMade(Some(Decision::Nak)),
            Event::DecisionSent(Decision::Nak),
        ]);
        assert_eq!(session.outcome(), Some(Outcome::Rejected));
    }

    #[test]
    fn declined_override_is_ready_timeout() {
        let session = drive(vec![Event::ReadyExhausted, Event::OverrideDeclined]);
        assert_eq!(session.outcome(), Some(Outcome::Timeout(Stage::AwaitReady)));
        assert!(!session.ready_observed());
    }

    #[test]
    fn no_decision_depends_on_echo() {
        let c = Coordinate::from_pair(1, 2);
        let aborted = drive(vec![
            Event::ReadyObserved,
            Event::FrameSent(c),
            Event::EchoReceived(c.to_frame()),
            Event::DecisionMade(None),
        ]);
        assert_eq!(aborted.outcome(), Some(Outcome::AbortedByOperator));

        let malformed = drive(vec![
            Event::ReadyExhausted,
            Event::OverrideGranted,
            Event::FrameSent(c),
            Event::EchoIncomplete(vec![0x22]),
            Event::DecisionMade(None),
        ]);
        assert_eq!(malformed.outcome(), Some(Outcome::MalformedEcho));
        assert!(malformed.echo_malformed());
    }

    #[test]
    fn incomplete_echo_still_reaches_decision() {
        let sent = Coordinate::from_pair(7, 8);
        assert_eq!(
            next_phase(Phase::AwaitEcho(sent), &Event::EchoIncomplete(vec![]), true),
            Some(Phase::ObtainDecision(sent))
        );
    }

    #[test]
    fn non_terminal_status_is_not_a_transition() {
        assert_eq!(
            next_phase(
                Phase::PollCompletion,
                &Event::CompletionReported(StatusCode::Generating),
                true
            ),
            None
        );
    }

    #[test]
    fn mismatched_decision_is_rejected() {
        let mut session = Session::new();
        session.apply(Event::ReadyObserved).unwrap();
        let err = session.apply(Event::DecisionSent(Decision::Ack)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition { phase: Phase::SubmitCoordinates, .. }
        ));
        // a rejected event leaves the phase alone
        assert_eq!(session.phase(), Phase::SubmitCoordinates);
    }

    #[test]
    fn finished_accepts_nothing() {
        let done = Phase::Finished(Outcome::Completed);
        assert_eq!(next_phase(done, &Event::ReadyObserved, true), None);
        assert_eq!(next_phase(done, &Event::CompletionTimedOut, true), None);
    }
}
