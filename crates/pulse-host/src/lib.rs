//! Serial host for the pulse generator: configuration, port discovery,
//! the serial transport, console operator and the run wiring.

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod port_select;
pub mod serial;
