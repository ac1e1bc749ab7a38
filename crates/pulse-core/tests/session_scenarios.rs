// crates/pulse-core/tests/session_scenarios.rs
use std::collections::VecDeque;
use std::time::Duration;

use pulse_core::sim::{ManualClock, RecordingSink, ScriptedLink};
use pulse_core::{
    Coordinate, CoordinateInput, CoordinateSource, Decision, DecisionSource, Echo, Outcome,
    SessionError, SessionEvent, SessionRunner, Stage, StopFlag, Timing,
};
use pulse_protocol::StatusCode;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Operator that answers from fixed queues and counts what it was asked.
#[derive(Default)]
struct ScriptedOperator {
    coordinates: VecDeque<CoordinateInput>,
    decisions: VecDeque<Option<Decision>>,
    overrides: VecDeque<bool>,
    coordinate_requests: usize,
    decision_requests: usize,
    override_requests: usize,
}

impl ScriptedOperator {
    fn new() -> Self {
        Self::default()
    }

    fn coordinate(mut self, x: u16, y: u16) -> Self {
        self.coordinates
            .push_back(CoordinateInput::Valid(Coordinate::from_pair(x, y)));
        self
    }

    fn invalid(mut self, reason: &str) -> Self {
        self.coordinates
            .push_back(CoordinateInput::Invalid(reason.to_string()));
        self
    }

    fn decision(mut self, d: Option<Decision>) -> Self {
        self.decisions.push_back(d);
        self
    }

    fn override_answer(mut self, answer: bool) -> Self {
        self.overrides.push_back(answer);
        self
    }
}

impl CoordinateSource for ScriptedOperator {
    fn next_coordinate(&mut self) -> CoordinateInput {
        self.coordinate_requests += 1;
        self.coordinates
            .pop_front()
            .unwrap_or(CoordinateInput::EndOfInput)
    }
}

impl DecisionSource for ScriptedOperator {
    fn continue_without_ready(&mut self) -> bool {
        self.override_requests += 1;
        self.overrides.pop_front().unwrap_or(false)
    }

    fn decide(&mut self, _sent: &Coordinate, _echo: &Echo) -> Option<Decision> {
        self.decision_requests += 1;
        self.decisions.pop_front().flatten()
    }
}

fn runner(link: ScriptedLink, clock: &ManualClock) -> SessionRunner<ScriptedLink, &ManualClock> {
    SessionRunner::new(link, clock, Timing::default())
}

const READY: &[u8] = &[StatusCode::WAITING];

// ---------------------------------------------------------------------------
// AwaitReady
// ---------------------------------------------------------------------------

#[test]
fn missing_ready_reaches_override_and_declining_writes_nothing() {
    let clock = ManualClock::new();
    let mut runner = runner(ScriptedLink::new(), &clock);
    let mut op = ScriptedOperator::new().override_answer(false);
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(session.outcome(), Some(Outcome::Timeout(Stage::AwaitReady)));
    assert_eq!(op.override_requests, 1);
    assert_eq!(op.coordinate_requests, 0);
    assert!(runner.transport().written().is_empty());
    assert!(sink.events.contains(&SessionEvent::ReadyMissing));
    // bounded: exactly one sleep per attempt
    assert_eq!(clock.sleeps(), u64::from(Timing::default().ready_poll_attempts));
    assert_eq!(clock.elapsed(), Timing::default().ready_budget());
}

#[test]
fn stray_bytes_before_waiting_are_reported_not_fatal() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(&[0x11])
        .then_silence(3)
        .then_bytes(&[0x7E])
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x01, 0x00, 0x02]);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new().coordinate(1, 2).decision(None);
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert!(session.ready_observed());
    assert_eq!(op.override_requests, 0);
    assert!(sink
        .events
        .contains(&SessionEvent::StrayStatus(StatusCode::Generating)));
    assert!(sink
        .events
        .contains(&SessionEvent::StrayStatus(StatusCode::Unknown(0x7E))));
    assert_eq!(session.outcome(), Some(Outcome::AbortedByOperator));
}

#[test]
fn granted_override_proceeds_without_ready() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_silence(100)
        .then_bytes(&[0x00, 0x05, 0x00, 0x06])
        .then_bytes(&[StatusCode::SUCCESS]);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new()
        .override_answer(true)
        .coordinate(5, 6)
        .decision(Some(Decision::Ack));
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert!(!session.ready_observed());
    assert_eq!(session.outcome(), Some(Outcome::Completed));
}

// ---------------------------------------------------------------------------
// SubmitCoordinates / AwaitEcho
// ---------------------------------------------------------------------------

#[test]
fn echo_bytes_are_decoded_into_the_pair() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x01, 0x02, 0x03, 0x04]);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new().coordinate(0x0102, 0x0304).decision(None);
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(session.echo().and_then(Echo::pair), Some((0x0102, 0x0304)));
    assert!(!session.echo_malformed());
}

#[test]
fn echo_split_across_polls_is_accumulated() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x01])
        .then_silence(2)
        .then_bytes(&[0x02, 0x03])
        .then_bytes(&[0x04]);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new().coordinate(1, 2).decision(None);

    let session = runner.run_cycle(&mut op, &mut RecordingSink::new()).unwrap();

    // mismatch with what was sent is recorded, not enforced
    assert_eq!(session.echo().and_then(Echo::pair), Some((0x0102, 0x0304)));
    assert!(!session.echo().unwrap().matches(&Coordinate::from_pair(1, 2)));
    assert_eq!(session.outcome(), Some(Outcome::AbortedByOperator));
}

#[test]
fn missing_echo_is_recorded_and_decision_still_asked() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new().then_bytes(READY);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new().coordinate(10, 20).decision(None);
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert!(session.echo_malformed());
    assert_eq!(session.echo(), Some(&Echo::Incomplete(vec![])));
    assert_eq!(op.decision_requests, 1);
    assert_eq!(session.outcome(), Some(Outcome::MalformedEcho));
    assert!(sink
        .events
        .contains(&SessionEvent::EchoMissing { received: vec![] }));
    // only the frame went out
    assert_eq!(runner.transport().written(), &[0x00, 0x0A, 0x00, 0x14]);
}

#[test]
fn short_echo_can_still_be_acked() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x0A])
        .then_silence(25)
        .then_bytes(&[StatusCode::SUCCESS]);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new()
        .coordinate(10, 20)
        .decision(Some(Decision::Ack));

    let session = runner.run_cycle(&mut op, &mut RecordingSink::new()).unwrap();

    assert_eq!(session.echo(), Some(&Echo::Incomplete(vec![0x00, 0x0A])));
    assert_eq!(session.outcome(), Some(Outcome::Completed));
}

#[test]
fn echo_wait_never_passes_its_deadline() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new().then_bytes(READY);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new().coordinate(1, 1).decision(None);

    runner.run_cycle(&mut op, &mut RecordingSink::new()).unwrap();

    let t = Timing::default();
    // ready returned on the first poll, so only settle + echo wait elapsed
    assert!(clock.elapsed() <= t.settle_delay + t.echo_timeout + t.echo_poll_interval);
    assert!(clock.elapsed() >= t.settle_delay + t.echo_timeout);
}

#[test]
fn invalid_coordinates_are_retried_without_transmitting() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x07, 0x00, 0x08]);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new()
        .invalid("not a number")
        .invalid("x coordinate 70000 out of range 0-65535")
        .coordinate(7, 8)
        .decision(None);
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(op.coordinate_requests, 3);
    assert_eq!(
        sink.count(|e| matches!(e, SessionEvent::InvalidCoordinate(_))),
        2
    );
    assert_eq!(session.coordinate(), Some(Coordinate::from_pair(7, 8)));
    assert_eq!(runner.transport().written(), &[0x00, 0x07, 0x00, 0x08]);
}

#[test]
fn input_is_discarded_before_the_frame_not_after() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x01, 0x00, 0x01]);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new().coordinate(1, 1).decision(None);

    runner.run_cycle(&mut op, &mut RecordingSink::new()).unwrap();

    // once entering AwaitReady, once right before the write
    assert_eq!(runner.transport().discards(), 2);
}

#[test]
fn flush_after_settle_adds_one_discard() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x01, 0x00, 0x01]);
    let timing = Timing {
        flush_after_settle: true,
        ..Timing::default()
    };
    let mut runner = SessionRunner::new(link, &clock, timing);
    let mut op = ScriptedOperator::new().coordinate(1, 1).decision(None);

    let session = runner.run_cycle(&mut op, &mut RecordingSink::new()).unwrap();

    assert_eq!(runner.transport().discards(), 3);
    // the scripted echo had not "arrived" yet, so it survives
    assert!(session.echo().unwrap().is_complete());
}

// ---------------------------------------------------------------------------
// ObtainDecision / SendDecision
// ---------------------------------------------------------------------------

#[test]
fn nak_writes_one_byte_and_skips_polling() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x03, 0x00, 0x04])
        .then_status(StatusCode::Success, 5);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new()
        .coordinate(3, 4)
        .decision(Some(Decision::Nak));
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(session.outcome(), Some(Outcome::Rejected));
    assert_eq!(
        runner.transport().written(),
        &[0x00, 0x03, 0x00, 0x04, StatusCode::NAK]
    );
    // nothing was polled after the decision
    assert_eq!(runner.transport().pending_steps(), 5);
    assert!(!sink.events.contains(&SessionEvent::NoResponse));
}

#[test]
fn no_decision_after_good_echo_is_operator_abort() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x03, 0x00, 0x04]);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new().coordinate(3, 4).decision(None);
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(session.outcome(), Some(Outcome::AbortedByOperator));
    assert_eq!(runner.transport().written().len(), 4);
    assert!(sink.events.contains(&SessionEvent::NoDecision));
}

// ---------------------------------------------------------------------------
// PollCompletion
// ---------------------------------------------------------------------------

#[test]
fn generating_then_success_completes() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x01, 0x00, 0x02])
        .then_status(StatusCode::Generating, 2)
        .then_status(StatusCode::Success, 1);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new()
        .coordinate(1, 2)
        .decision(Some(Decision::Ack));
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(session.outcome(), Some(Outcome::Completed));
    assert_eq!(sink.count(|e| *e == SessionEvent::Generating), 2);
    assert_eq!(
        sink.events.last(),
        Some(&SessionEvent::Finished(Outcome::Completed))
    );
}

#[test]
fn error_after_ack_is_device_error() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x01, 0x00, 0x02])
        .then_status(StatusCode::Generating, 1)
        .then_silence(3)
        .then_bytes(&[0x99])
        .then_status(StatusCode::Error, 1);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new()
        .coordinate(1, 2)
        .decision(Some(Decision::Ack));
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(session.outcome(), Some(Outcome::DeviceError));
    assert_eq!(sink.count(|e| *e == SessionEvent::NoResponse), 3);
    assert!(sink.events.contains(&SessionEvent::UnknownStatus(0x99)));
}

#[test]
fn endless_generating_times_out() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x01, 0x00, 0x02])
        .then_status(StatusCode::Generating, 1000);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new()
        .coordinate(1, 2)
        .decision(Some(Decision::Ack));
    let mut sink = RecordingSink::new();

    let before = clock.elapsed();
    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(
        session.outcome(),
        Some(Outcome::Timeout(Stage::PollCompletion))
    );
    // 30 s at 200 ms per poll
    assert_eq!(sink.count(|e| *e == SessionEvent::Generating), 150);
    assert!(clock.elapsed() - before >= Timing::default().completion_timeout);
}

// ---------------------------------------------------------------------------
// End to end / errors
// ---------------------------------------------------------------------------

#[test]
fn full_cycle_writes_exactly_five_bytes() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new()
        .then_bytes(READY)
        .then_bytes(&[0x00, 0x64, 0x00, 0xC8])
        .then_status(StatusCode::Success, 1);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new()
        .coordinate(100, 200)
        .decision(Some(Decision::Ack));
    let mut sink = RecordingSink::new();

    let session = runner.run_cycle(&mut op, &mut sink).unwrap();

    assert_eq!(session.outcome(), Some(Outcome::Completed));
    assert_eq!(session.echo().and_then(Echo::pair), Some((100, 200)));
    assert_eq!(session.decision(), Some(Decision::Ack));
    assert_eq!(
        runner.transport().written(),
        &[0x00, 0x64, 0x00, 0xC8, StatusCode::ACK]
    );
}

#[test]
fn write_failure_is_fatal() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new().then_bytes(READY).failing_writes();
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new().coordinate(1, 2);

    let err = runner
        .run_cycle(&mut op, &mut RecordingSink::new())
        .unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    assert!(err.is_fatal());
}

#[test]
fn closed_input_ends_the_cycle_without_outcome() {
    let clock = ManualClock::new();
    let link = ScriptedLink::new().then_bytes(READY);
    let mut runner = runner(link, &clock);
    let mut op = ScriptedOperator::new();

    let err = runner
        .run_cycle(&mut op, &mut RecordingSink::new())
        .unwrap_err();

    assert!(matches!(err, SessionError::InputClosed));
    assert!(!err.is_fatal());
    assert!(runner.transport().written().is_empty());
}

#[test]
fn stop_request_interrupts_polling() {
    let clock = ManualClock::new();
    let stop = StopFlag::new();
    stop.request_stop();
    let mut runner = runner(ScriptedLink::new(), &clock).with_stop_flag(stop);

    let err = runner
        .run_cycle(&mut ScriptedOperator::new(), &mut RecordingSink::new())
        .unwrap_err();

    assert!(matches!(err, SessionError::Interrupted));
    assert_eq!(clock.elapsed(), Duration::ZERO);
}
