//! Driver loop: runs sessions back to back until input ends, the
//! operator stops, a stop is requested, or the transport fails.

use serde::Serialize;
use tracing::{error, info};

use crate::clock::Clock;
use crate::error::SessionError;
use crate::operator::{CoordinateSource, DecisionSource, StatusSink};
use crate::outcome::{Outcome, Stage};
use crate::runner::SessionRunner;
use crate::transport::Transport;

/// Why the loop ended without a fatal error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum StopReason {
    InputClosed,
    OperatorQuit,
    Interrupted,
    CycleLimit,
}

/// Per-outcome counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cycles: u64,
    pub completed: u64,
    pub rejected: u64,
    pub device_errors: u64,
    pub ready_timeouts: u64,
    pub completion_timeouts: u64,
    pub aborted: u64,
    pub malformed_echoes: u64,
    pub stopped_by: Option<StopReason>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: Outcome) {
        self.cycles += 1;
        let slot = match outcome {
            Outcome::Completed => &mut self.completed,
            Outcome::Rejected => &mut self.rejected,
            Outcome::DeviceError => &mut self.device_errors,
            Outcome::Timeout(Stage::AwaitReady) => &mut self.ready_timeouts,
            Outcome::Timeout(Stage::PollCompletion) => &mut self.completion_timeouts,
            Outcome::AbortedByOperator => &mut self.aborted,
            Outcome::MalformedEcho => &mut self.malformed_echoes,
        };
        *slot += 1;
    }
}

pub struct Driver<T, C> {
    runner: SessionRunner<T, C>,
    max_cycles: Option<u64>,
}

impl<T: Transport, C: Clock> Driver<T, C> {
    pub fn new(runner: SessionRunner<T, C>) -> Self {
        Self {
            runner,
            max_cycles: None,
        }
    }

    /// Stop after this many finished cycles.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn runner(&self) -> &SessionRunner<T, C> {
        &self.runner
    }

    /// Run cycles until something ends the run.
    ///
    /// Only a transport failure (or an internal transition bug) is
    /// returned as an error; the summary so far is logged first.
    pub fn run<O>(
        &mut self,
        operator: &mut O,
        sink: &mut dyn StatusSink,
    ) -> Result<RunSummary, SessionError>
    where
        O: CoordinateSource + DecisionSource + ?Sized,
    {
        let mut summary = RunSummary::default();

        let reason = loop {
            if self.runner.stop_flag().is_stop_requested() {
                break StopReason::Interrupted;
            }
            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break StopReason::CycleLimit;
            }

            match self.runner.run_cycle(operator, sink) {
                Ok(session) => {
                    if let Some(outcome) = session.outcome() {
                        summary.record(outcome);
                    }
                }
                Err(SessionError::InputClosed) => break StopReason::InputClosed,
                Err(SessionError::Interrupted) => break StopReason::Interrupted,
                Err(e) => {
                    error!("run aborted after {} cycles: {}", summary.cycles, e);
                    return Err(e);
                }
            }

            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break StopReason::CycleLimit;
            }
            if operator.input_closed() {
                break StopReason::InputClosed;
            }
            if !operator.proceed_to_next_cycle() {
                break if operator.input_closed() {
                    StopReason::InputClosed
                } else {
                    StopReason::OperatorQuit
                };
            }
        };

        summary.stopped_by = Some(reason);
        info!(
            "run ended ({:?}): {} cycles, {} completed",
            reason, summary.cycles, summary.completed
        );
        Ok(summary)
    }
}
