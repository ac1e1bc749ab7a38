//! Configuration for the host driver.
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. environment variables:
//!    - `PULSE_PORT` (default: auto-detect)
//!    - `PULSE_BAUD` (default: "9600")
//! 4. command line flags, applied by the caller
//!
//! ```toml
//! port = "/dev/ttyACM0"
//! baud = 9600
//! pause_between_cycles = true
//! startup_delay_ms = 1000
//!
//! [timing]
//! ready_poll_interval_ms = 100
//! ready_poll_attempts = 100
//! settle_delay_ms = 90
//! echo_poll_interval_ms = 100
//! echo_timeout_ms = 2000
//! completion_poll_interval_ms = 200
//! completion_timeout_ms = 30000
//! flush_after_settle = false
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use pulse_core::Timing;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BAUD: u32 = 9600;

/// Time the microcontroller needs after the port opens.
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 1000;

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Serial endpoint, e.g. "/dev/ttyACM0" or "COM11". `None` = auto-detect.
    pub port: Option<String>,

    /// Line speed. USB CDC devices ignore it but the binding needs one.
    pub baud: u32,

    /// Wait for Enter between cycles.
    pub pause_between_cycles: bool,

    /// Delay before the first cycle.
    pub startup_delay_ms: u64,

    pub timing: TimingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            baud: DEFAULT_BAUD,
            pause_between_cycles: true,
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            timing: TimingConfig::default(),
        }
    }
}

/// [`Timing`] in file-friendly milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub ready_poll_interval_ms: u64,
    pub ready_poll_attempts: u32,
    pub settle_delay_ms: u64,
    pub echo_poll_interval_ms: u64,
    pub echo_timeout_ms: u64,
    pub completion_poll_interval_ms: u64,
    pub completion_timeout_ms: u64,
    pub flush_after_settle: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let t = Timing::default();
        Self {
            ready_poll_interval_ms: millis(t.ready_poll_interval),
            ready_poll_attempts: t.ready_poll_attempts,
            settle_delay_ms: millis(t.settle_delay),
            echo_poll_interval_ms: millis(t.echo_poll_interval),
            echo_timeout_ms: millis(t.echo_timeout),
            completion_poll_interval_ms: millis(t.completion_poll_interval),
            completion_timeout_ms: millis(t.completion_timeout),
            flush_after_settle: t.flush_after_settle,
        }
    }
}

impl TimingConfig {
    pub fn to_timing(&self) -> Timing {
        Timing {
            ready_poll_interval: Duration::from_millis(self.ready_poll_interval_ms),
            ready_poll_attempts: self.ready_poll_attempts,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            echo_poll_interval: Duration::from_millis(self.echo_poll_interval_ms),
            echo_timeout: Duration::from_millis(self.echo_timeout_ms),
            completion_poll_interval: Duration::from_millis(self.completion_poll_interval_ms),
            completion_timeout: Duration::from_millis(self.completion_timeout_ms),
            flush_after_settle: self.flush_after_settle,
        }
    }
}

impl Config {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `PULSE_*` variables using `lookup` (normally `env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PULSE_PORT").filter(|p| !p.trim().is_empty()) {
            self.port = Some(port);
        }
        if let Some(baud) = read_var(&lookup, "PULSE_BAUD")? {
            self.baud = baud;
        }
        Ok(())
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

fn read_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Env {
                key: key.to_string(),
                reason: e.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
