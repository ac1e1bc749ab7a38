//! Effectful half of the session: performs the I/O for the current phase
//! and feeds the observed [`Event`] back into the [`Session`].
//!
//! Every wait is a bounded poll against the injected [`Clock`]; nothing
//! here blocks without a deadline. The stop flag is checked at every
//! poll tick so an interrupt unwinds promptly and the transport is
//! dropped by its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pulse_protocol::{classify_status, decode_echo, Frame, StatusCode, FRAME_LEN};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::coordinate::Coordinate;
use crate::error::SessionError;
use crate::operator::{CoordinateInput, CoordinateSource, DecisionSource, SessionEvent, StatusSink};
use crate::outcome::Decision;
use crate::session::{Echo, Event, Phase, Session};
use crate::timing::Timing;
use crate::transport::Transport;

/// Shared "please stop" signal, set from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs sessions, one at a time, over a single open transport.
pub struct SessionRunner<T, C> {
    transport: T,
    clock: C,
    timing: Timing,
    stop: StopFlag,
}

impl<T: Transport, C: Clock> SessionRunner<T, C> {
    pub fn new(transport: T, clock: C, timing: Timing) -> Self {
        Self {
            transport,
            clock,
            timing,
            stop: StopFlag::new(),
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Drive one full cycle to its outcome.
    ///
    /// Returns the finished session. Errors are reserved for transport
    /// failure, closed operator input, and interruption.
    pub fn run_cycle<O>(
        &mut self,
        operator: &mut O,
        sink: &mut dyn StatusSink,
    ) -> Result<Session, SessionError>
    where
        O: CoordinateSource + DecisionSource + ?Sized,
    {
        let mut session = Session::new();
        sink.notify(&SessionEvent::AwaitingReady);

        loop {
            let event = match session.phase() {
                Phase::Finished(outcome) => {
                    info!("cycle finished: {}", outcome);
                    sink.notify(&SessionEvent::Finished(outcome));
                    return Ok(session);
                }
                Phase::AwaitReady => self.await_ready(sink)?,
                Phase::OperatorOverride => self.operator_override(operator),
                Phase::SubmitCoordinates => self.submit_coordinates(operator, sink)?,
                Phase::AwaitEcho(sent) => self.await_echo(sent, sink)?,
                Phase::ObtainDecision(sent) => {
                    let echo = session
                        .echo()
                        .cloned()
                        .unwrap_or(Echo::Incomplete(Vec::new()));
                    self.obtain_decision(sent, &echo, operator, sink)
                }
                Phase::SendDecision(decision) => self.send_decision(decision, sink)?,
                Phase::PollCompletion => self.poll_completion(sink)?,
            };
            session.apply(event)?;
        }
    }

    fn check_stop(&self) -> Result<(), SessionError> {
        if self.stop.is_stop_requested() {
            return Err(SessionError::Interrupted);
        }
        Ok(())
    }

    fn await_ready(&mut self, sink: &mut dyn StatusSink) -> Result<Event, SessionError> {
        self.transport.discard_input_buffer()?;

        for attempt in 0..self.timing.ready_poll_attempts {
            self.check_stop()?;
            if let Some(byte) = self.transport.read_byte()? {
                match classify_status(byte) {
                    StatusCode::Waiting => {
                        debug!("device ready after {} polls", attempt + 1);
                        sink.notify(&SessionEvent::Ready);
                        return Ok(Event::ReadyObserved);
                    }
                    other => sink.notify(&SessionEvent::StrayStatus(other)),
                }
            }
            self.clock.sleep(self.timing.ready_poll_interval);
        }

        warn!(
            "no WAITING status after {} polls",
            self.timing.ready_poll_attempts
        );
        sink.notify(&SessionEvent::ReadyMissing);
        Ok(Event::ReadyExhausted)
    }

    fn operator_override<O>(&mut self, operator: &mut O) -> Event
    where
        O: DecisionSource + ?Sized,
    {
        if operator.continue_without_ready() {
            info!("operator chose to continue without ready signal");
            Event::OverrideGranted
        } else {
            Event::OverrideDeclined
        }
    }

    fn submit_coordinates<O>(
        &mut self,
        operator: &mut O,
        sink: &mut dyn StatusSink,
    ) -> Result<Event, SessionError>
    where
        O: CoordinateSource + ?Sized,
    {
        let coordinate = loop {
            self.check_stop()?;
            match operator.next_coordinate() {
                CoordinateInput::Valid(c) => break c,
                CoordinateInput::Invalid(reason) => {
                    debug!("coordinate rejected: {}", reason);
                    sink.notify(&SessionEvent::InvalidCoordinate(reason));
                }
                CoordinateInput::EndOfInput => return Err(SessionError::InputClosed),
            }
        };

        let frame = coordinate.to_frame();

        // Stale bytes from the ready wait must not be read as echo.
        self.transport.discard_input_buffer()?;
        self.transport.write(frame.as_bytes())?;
        info!("sent {} as [{}]", coordinate, frame);
        sink.notify(&SessionEvent::FrameSent { coordinate, frame });

        self.clock.sleep(self.timing.settle_delay);
        if self.timing.flush_after_settle {
            self.transport.discard_input_buffer()?;
        }

        Ok(Event::FrameSent(coordinate))
    }

    fn await_echo(
        &mut self,
        sent: Coordinate,
        sink: &mut dyn StatusSink,
    ) -> Result<Event, SessionError> {
        self.check_stop()?;
        let deadline = self.clock.now() + self.timing.echo_timeout;
        let bytes = self.transport.read_exact_with_deadline(
            FRAME_LEN,
            deadline,
            self.timing.echo_poll_interval,
            &self.clock,
        )?;

        match decode_echo(&bytes) {
            Ok((x, y)) => {
                let echo = Frame::from_pair(x, y);
                if echo != sent.to_frame() {
                    // Shown to the operator, never enforced here.
                    warn!("echo [{}] differs from sent [{}]", echo, sent.to_frame());
                }
                sink.notify(&SessionEvent::Echoed { sent, echo });
                Ok(Event::EchoReceived(echo))
            }
            Err(e) => {
                warn!("{}", e);
                sink.notify(&SessionEvent::EchoMissing {
                    received: bytes.clone(),
                });
                Ok(Event::EchoIncomplete(bytes))
            }
        }
    }

    fn obtain_decision<O>(
        &mut self,
        sent: Coordinate,
        echo: &Echo,
        operator: &mut O,
        sink: &mut dyn StatusSink,
    ) -> Event
    where
        O: DecisionSource + ?Sized,
    {
        let decision = operator.decide(&sent, echo);
        if decision.is_none() {
            sink.notify(&SessionEvent::NoDecision);
        }
        Event::DecisionMade(decision)
    }

    fn send_decision(
        &mut self,
        decision: Decision,
        sink: &mut dyn StatusSink,
    ) -> Result<Event, SessionError> {
        self.transport.write(&[decision.status().as_u8()])?;
        debug!("sent decision {:?}", decision);
        sink.notify(&SessionEvent::DecisionSent(decision));
        Ok(Event::DecisionSent(decision))
    }

    fn poll_completion(&mut self, sink: &mut dyn StatusSink) -> Result<Event, SessionError> {
        let deadline = self.clock.now() + self.timing.completion_timeout;

        loop {
            self.check_stop()?;
            if self.clock.now() >= deadline {
                warn!("timed out waiting for SUCCESS status");
                return Ok(Event::CompletionTimedOut);
            }

            match self.transport.read_byte()?.map(classify_status) {
                Some(code @ (StatusCode::Success | StatusCode::Error)) => {
                    return Ok(Event::CompletionReported(code));
                }
                // Generating does not extend the deadline.
                Some(StatusCode::Generating) => sink.notify(&SessionEvent::Generating),
                Some(StatusCode::Unknown(b)) => sink.notify(&SessionEvent::UnknownStatus(b)),
                Some(other) => sink.notify(&SessionEvent::StrayStatus(other)),
                None => sink.notify(&SessionEvent::NoResponse),
            }

            self.clock.sleep(self.timing.completion_poll_interval);
        }
    }
}
