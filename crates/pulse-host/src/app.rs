//! Top-level wiring for one host run.
//!
//! This module:
//! - Opens the transport (serial port or simulated device).
//! - Runs the blocking driver loop on a tokio blocking thread.
//! - Listens for Ctrl-C and turns it into a stop request.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use pulse_core::sim::SimulatedDevice;
use pulse_core::{
    BatchCoordinates, Clock, Coordinate, Decision, Driver, FixedDecision, Operator, RunSummary,
    SessionRunner, StopFlag, SystemClock, Transport,
};

use crate::config::Config;
use crate::console::{ConsolePrompt, ConsoleStatus};
use crate::error::PortError;
use crate::port_select::PortSelector;
use crate::serial::SerialTransport;

/// How long an interrupted run may take to unwind before we give up on it.
/// A driver blocked on stdin never sees the stop flag.
pub const INTERRUPT_GRACE: Duration = Duration::from_secs(3);

type BoxedTransport = Box<dyn Transport + Send>;

/// Where coordinates and decisions come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorMode {
    Interactive,
    Batch {
        coordinates: Vec<Coordinate>,
        decision: Option<Decision>,
    },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: Config,
    pub simulate: bool,
    pub mode: OperatorMode,
}

/// Run the host until input ends, the operator quits or Ctrl-C.
///
/// Returns `None` when an interrupted driver did not unwind within
/// [`INTERRUPT_GRACE`]; the caller should exit the process. The transport
/// is then still owned by the blocked thread and is only released by the
/// OS at exit.
pub async fn run(options: RunOptions) -> Result<Option<RunSummary>> {
    let RunOptions {
        config,
        simulate,
        mode,
    } = options;

    let transport = connect(&config, simulate)?;

    let stop = StopFlag::new();
    let worker_stop = stop.clone();
    let mut driver_task: JoinHandle<Result<RunSummary>> =
        tokio::task::spawn_blocking(move || drive(config, transport, mode, worker_stop));

    tokio::select! {
        joined = &mut driver_task => {
            let summary = joined.context("driver thread failed")??;
            Ok(Some(summary))
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            println!("\nExiting...");
            stop.request_stop();

            match tokio::time::timeout(INTERRUPT_GRACE, &mut driver_task).await {
                Ok(joined) => {
                    let summary = joined.context("driver thread failed")??;
                    Ok(Some(summary))
                }
                Err(_) => {
                    warn!("driver still blocked after {:?}, exiting", INTERRUPT_GRACE);
                    Ok(None)
                }
            }
        }
    }
}

fn connect(config: &Config, simulate: bool) -> Result<BoxedTransport, PortError> {
    if simulate {
        println!("Connecting to simulated MCU...");
        return Ok(Box::new(SimulatedDevice::new()));
    }

    let name = PortSelector::new(config.port.clone()).resolve()?;
    println!("Connecting to MCU on {} at {} baud...", name, config.baud);
    let port = SerialTransport::open(&name, config.baud)?;
    println!("Connected successfully!");
    Ok(Box::new(port))
}

/// Blocking half: startup delay, then the driver loop.
fn drive(
    config: Config,
    transport: BoxedTransport,
    mode: OperatorMode,
    stop: StopFlag,
) -> Result<RunSummary> {
    let clock = SystemClock;
    println!("\nWaiting for MCU to initialize...");
    clock.sleep(config.startup_delay());

    let runner =
        SessionRunner::new(transport, clock, config.timing.to_timing()).with_stop_flag(stop);
    let mut driver = Driver::new(runner);
    let mut status = ConsoleStatus::new(io::stdout());

    let summary = match mode {
        OperatorMode::Interactive => {
            let stdin = io::stdin();
            let mut prompt =
                ConsolePrompt::new(stdin.lock(), io::stdout(), config.pause_between_cycles);
            driver.run(&mut prompt, &mut status)?
        }
        OperatorMode::Batch {
            coordinates,
            decision,
        } => {
            info!("batch run over {} coordinates", coordinates.len());
            let mut operator = Operator::new(
                BatchCoordinates::new(coordinates),
                FixedDecision::new(decision, true),
            );
            driver.run(&mut operator, &mut status)?
        }
    };

    Ok(summary)
}
