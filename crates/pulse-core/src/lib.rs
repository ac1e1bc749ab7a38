//! pulse-core
//!
//! Host-side protocol logic for the pulse generator link:
//! - validated coordinates and cycle outcomes
//! - transport and clock abstractions
//! - the session phases and their pure transition function
//! - the runner that performs each phase's I/O with bounded waits
//! - the driver loop and run summary
//! - simulated links for tests and demos
//!
//! No serial binding lives here; see the `pulse-host` crate.

pub mod error;
pub mod coordinate;
pub mod timing;
pub mod clock;
pub mod transport;
pub mod outcome;
pub mod session;
pub mod operator;
pub mod runner;
pub mod driver;
pub mod sim;

pub use error::{CoordinateError, SessionError, TransportError};
pub use coordinate::Coordinate;
pub use timing::Timing;
pub use clock::{Clock, SystemClock};
pub use transport::Transport;
pub use outcome::{Decision, Outcome, Stage};
pub use session::{next_phase, Echo, Event, Phase, Session};

pub use operator::{
    BatchCoordinates,
    CoordinateInput,
    CoordinateSource,
    DecisionSource,
    FixedDecision,
    Operator,
    SessionEvent,
    StatusSink,
};

pub use runner::{SessionRunner, StopFlag};
pub use driver::{Driver, RunSummary, StopReason};
