//! Terminal front end: operator prompts and status lines.
//!
//! `ConsolePrompt` reads coordinates and decisions from a line-oriented
//! reader; `ConsoleStatus` renders [`SessionEvent`]s. Both are generic
//! over the streams so tests can drive them with in-memory buffers.

use std::io::{self, BufRead, Write};

use chrono::Local;
use pulse_core::{
    Coordinate, CoordinateInput, CoordinateSource, Decision, DecisionSource, Echo, Outcome,
    SessionEvent, Stage, StatusSink,
};
use pulse_protocol::{hex_bytes, COORDINATE_MAX};
use tracing::warn;

pub const NOT_NUMERIC: &str = "Invalid input. Please enter numeric values.";

/// Interactive operator on a pair of streams.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
    pause_between_cycles: bool,
    exhausted: bool,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W, pause_between_cycles: bool) -> Self {
        Self {
            input,
            output,
            pause_between_cycles,
            exhausted: false,
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Print `prompt` and read one trimmed line. `None` on end of input.
    fn ask(&mut self, prompt: &str) -> Option<String> {
        if let Err(e) = write!(self.output, "{}", prompt).and_then(|_| self.output.flush()) {
            warn!("failed to write prompt: {}", e);
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                self.exhausted = true;
                None
            }
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                warn!("failed to read operator input: {}", e);
                self.exhausted = true;
                None
            }
        }
    }

    fn header(&mut self, title: &str) {
        let _ = writeln!(self.output, "\n=== {} ===", title);
    }
}

impl<R: BufRead, W: Write> CoordinateSource for ConsolePrompt<R, W> {
    fn next_coordinate(&mut self) -> CoordinateInput {
        self.header("ENTER COORDINATES");

        let x_prompt = format!("Enter X coordinate (0-{}): ", COORDINATE_MAX);
        let Some(x) = self.ask(&x_prompt) else {
            return CoordinateInput::EndOfInput;
        };
        let y_prompt = format!("Enter Y coordinate (0-{}): ", COORDINATE_MAX);
        let Some(y) = self.ask(&y_prompt) else {
            return CoordinateInput::EndOfInput;
        };

        parse_coordinate(&x, &y)
    }
}

impl<R: BufRead, W: Write> DecisionSource for ConsolePrompt<R, W> {
    fn continue_without_ready(&mut self) -> bool {
        self.ask("Continue anyway? (y/n): ")
            .is_some_and(|answer| answer.eq_ignore_ascii_case("y"))
    }

    fn decide(&mut self, _sent: &Coordinate, _echo: &Echo) -> Option<Decision> {
        self.header("SEND RESPONSE");
        let answer = self.ask("Send ACK (a) or NAK (n)? ")?;
        match answer.to_lowercase().as_str() {
            "a" => Some(Decision::Ack),
            "n" => Some(Decision::Nak),
            _ => None,
        }
    }

    fn proceed_to_next_cycle(&mut self) -> bool {
        if !self.pause_between_cycles {
            return true;
        }
        self.header("READY FOR NEXT COMMAND");
        self.ask("Press Enter to continue...").is_some()
    }

    fn input_closed(&self) -> bool {
        self.exhausted
    }
}

/// Turn the two typed answers into a coordinate or a reason to re-ask.
pub fn parse_coordinate(x: &str, y: &str) -> CoordinateInput {
    let (Ok(x), Ok(y)) = (x.trim().parse::<i64>(), y.trim().parse::<i64>()) else {
        return CoordinateInput::Invalid(NOT_NUMERIC.to_string());
    };
    match Coordinate::new(x, y) {
        Ok(c) => CoordinateInput::Valid(c),
        Err(_) => CoordinateInput::Invalid(format!(
            "Coordinates must be in range 0-{}",
            COORDINATE_MAX
        )),
    }
}

/// Status lines for the operator.
pub struct ConsoleStatus<W> {
    output: W,
    timestamps: bool,
}

impl<W: Write> ConsoleStatus<W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            timestamps: true,
        }
    }

    /// Drop the `[HH:MM:SS]` prefix (stable output for tests).
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        if self.timestamps {
            write!(self.output, "[{}] ", Local::now().format("%H:%M:%S"))?;
        }
        writeln!(self.output, "{}", text)
    }

    fn header(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.output, "\n=== {} ===", title)
    }

    fn render(&mut self, event: &SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::AwaitingReady => self.header("WAITING FOR MCU READY STATE")?,
            SessionEvent::Ready => self.line("MCU is ready and waiting for coordinates.")?,
            SessionEvent::StrayStatus(status) => {
                self.line(&format!("Received status: 0x{:02X}", status.as_u8()))?
            }
            SessionEvent::ReadyMissing => self.line(
                "Warning: Did not receive WAITING status. MCU may not be ready.",
            )?,
            SessionEvent::InvalidCoordinate(reason) => self.line(&format!("Error: {}", reason))?,
            SessionEvent::FrameSent { coordinate, frame } => {
                self.header("SENDING COORDINATES")?;
                self.line(&format!("Sending {}", coordinate))?;
                self.line(&format!("Sent: {}", frame))?;
                self.line("Waiting for echo response...")?;
            }
            SessionEvent::Echoed { sent, echo } => {
                self.line(&format!("MCU echoed: 0x{}", hex_bytes(echo.as_bytes()).replace(' ', "")))?;
                if sent.to_frame() != *echo {
                    let (x, y) = echo.pair();
                    self.line(&format!(
                        "Warning: echo ({}, {}) does not match sent {}",
                        x, y, sent
                    ))?;
                }
            }
            SessionEvent::EchoMissing { received } => {
                self.line("Warning: No echo received from MCU")?;
                if !received.is_empty() {
                    self.line(&format!(
                        "Partial echo ({} bytes): {}",
                        received.len(),
                        hex_bytes(received)
                    ))?;
                }
            }
            SessionEvent::DecisionSent(Decision::Ack) => {
                self.line("Sending ACK...")?;
                self.header("MONITORING MCU STATUS")?;
            }
            SessionEvent::DecisionSent(Decision::Nak) => {
                self.line("Sending NAK...")?;
                self.line("MCU should blink LED to indicate error")?;
            }
            SessionEvent::NoDecision => self.line("Invalid input, no response sent.")?,
            SessionEvent::Generating => self.line("MCU status: GENERATING pulses...")?,
            SessionEvent::UnknownStatus(byte) => {
                self.line(&format!("MCU status: Unknown (0x{:02X})", byte))?
            }
            SessionEvent::NoResponse => self.line("MCU status: No Response")?,
            SessionEvent::Finished(outcome) => self.finished(*outcome)?,
        }
        self.output.flush()
    }

    fn finished(&mut self, outcome: Outcome) -> io::Result<()> {
        match outcome {
            Outcome::Completed => self.line("MCU status: SUCCESS - Operation completed!"),
            Outcome::DeviceError => self.line("MCU status: ERROR - Pulse generation failed"),
            Outcome::Timeout(Stage::PollCompletion) => {
                self.line("Warning: Timeout waiting for SUCCESS status")
            }
            Outcome::Rejected => Ok(()),
            other => self.line(&format!("Cycle ended: {}", other)),
        }
    }
}

impl<W: Write> StatusSink for ConsoleStatus<W> {
    fn notify(&mut self, event: &SessionEvent) {
        if let Err(e) = self.render(event) {
            warn!("failed to write status line: {}", e);
        }
    }
}
