// crates/pulse-host/src/main.rs

use std::io;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pulse_host::app::{self, RunOptions};
use pulse_host::cli::Cli;
use pulse_host::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; diagnostics go to stderr, operator lines to stdout
    let default_level = if cli.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);

    let options = RunOptions {
        config,
        simulate: cli.simulate,
        mode: cli.mode(),
    };

    match app::run(options).await? {
        Some(summary) => {
            if cli.summary_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            Ok(())
        }
        // Interrupted while blocked on stdin. The driver thread still owns
        // the port, so no close message is printed; the OS releases the
        // handle when the process exits.
        None => process::exit(130),
    }
}
