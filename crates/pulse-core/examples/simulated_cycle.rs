//! Example: one cycle against the firmware model.
//!
//! Usage:
//!
//! ```bash
//! cargo run -p pulse-core --example simulated_cycle -- 1200 800
//! ```
//!
//! It will:
//! - wait for the simulated device to report ready
//! - send the given coordinate and ACK the echo
//! - print every progress event and the final outcome.

use std::env;
use std::error::Error;

use pulse_core::sim::SimulatedDevice;
use pulse_core::{
    BatchCoordinates, Coordinate, Decision, FixedDecision, Operator, SessionEvent,
    SessionRunner, StatusSink, SystemClock, Timing,
};

struct PrintEvents;

impl StatusSink for PrintEvents {
    fn notify(&mut self, event: &SessionEvent) {
        println!("--> {:?}", event);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let x: i64 = args.next().unwrap_or_else(|| "100".to_string()).parse()?;
    let y: i64 = args.next().unwrap_or_else(|| "200".to_string()).parse()?;
    let coordinate = Coordinate::new(x, y)?;

    let mut runner = SessionRunner::new(SimulatedDevice::new(), SystemClock, Timing::default());
    let mut operator = Operator::new(
        BatchCoordinates::new([coordinate]),
        FixedDecision::new(Some(Decision::Ack), true),
    );

    let session = runner.run_cycle(&mut operator, &mut PrintEvents)?;
    match session.outcome() {
        Some(outcome) => println!("Outcome: {}", outcome),
        None => println!("Cycle did not finish"),
    }
    Ok(())
}
