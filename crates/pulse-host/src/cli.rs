// crates/pulse-host/src/cli.rs

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pulse_core::{Coordinate, Decision};

use crate::app::OperatorMode;
use crate::config::Config;

#[derive(Parser, Debug)]
#[clap(name = "pulse-host")]
#[clap(about = "Send coordinates to the pulse generator over a serial link")]
pub struct Cli {
    /// Serial port (auto-detected when omitted)
    #[clap(short, long)]
    pub port: Option<String>,

    /// Baud rate
    #[clap(short, long)]
    pub baud: Option<u32>,

    /// TOML configuration file
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Talk to a simulated device instead of a serial port
    #[clap(long)]
    pub simulate: bool,

    /// Run unattended over these coordinates ("X,Y", repeatable)
    #[clap(long = "batch", value_name = "X,Y", value_parser = parse_pair)]
    pub batch: Vec<Coordinate>,

    /// Decision sent for every cycle in batch mode
    #[clap(long, value_enum, default_value_t = DecisionArg::Ack)]
    pub decision: DecisionArg,

    /// Do not wait for Enter between cycles
    #[clap(long)]
    pub no_pause: bool,

    /// Print the run summary as JSON on exit
    #[clap(long)]
    pub summary_json: bool,

    /// Enable debug logging
    #[clap(short, long)]
    pub debug: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    Ack,
    Nak,
    None,
}

impl From<DecisionArg> for Option<Decision> {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Ack => Some(Decision::Ack),
            DecisionArg::Nak => Some(Decision::Nak),
            DecisionArg::None => None,
        }
    }
}

impl Cli {
    /// Flags take precedence over file and environment.
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.baud = baud;
        }
        if self.no_pause {
            config.pause_between_cycles = false;
        }
    }

    pub fn mode(&self) -> OperatorMode {
        if self.batch.is_empty() {
            OperatorMode::Interactive
        } else {
            OperatorMode::Batch {
                coordinates: self.batch.clone(),
                decision: self.decision.into(),
            }
        }
    }
}

/// Parse "X,Y" into a coordinate, range-checked.
pub fn parse_pair(s: &str) -> Result<Coordinate, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {:?}", s))?;
    let x: i64 = x.trim().parse().map_err(|_| format!("bad X value {:?}", x))?;
    let y: i64 = y.trim().parse().map_err(|_| format!("bad Y value {:?}", y))?;
    Coordinate::new(x, y).map_err(|e| e.to_string())
}
