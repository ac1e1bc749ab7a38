//! Errors raised before any session starts.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Finding or opening the serial endpoint failed. Aborts the run.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("could not list serial ports: {0}")]
    Enumerate(#[source] serialport::Error),

    #[error("no serial port looks like the microcontroller ({candidates} ports checked)")]
    NoDevice { candidates: usize },

    #[error("could not open {name} at {baud} baud: {source}")]
    Open {
        name: String,
        baud: u32,
        #[source]
        source: serialport::Error,
    },
}

/// Loading configuration failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Env {
        key: String,
        value: String,
        reason: String,
    },
}
