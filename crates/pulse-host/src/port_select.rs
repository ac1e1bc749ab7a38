//! Picking the serial endpoint.
//!
//! An explicit name is used as-is. Otherwise every port the OS reports
//! is described in lowercase and the first one mentioning a typical
//! microcontroller/USB-serial keyword wins.

use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, info};

use crate::error::PortError;

/// Substrings that mark a port as a likely ATmega32U4-style device.
pub const DEVICE_KEYWORDS: [&str; 4] = ["arduino", "atmega", "usb", "serial"];

/// What discovery knows about one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub name: String,
    /// Lowercase free text: port name, then USB product and manufacturer.
    pub description: String,
}

impl PortCandidate {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_lowercase(),
        }
    }

    pub fn is_likely_device(&self) -> bool {
        DEVICE_KEYWORDS
            .iter()
            .any(|kw| self.description.contains(kw))
    }
}

impl From<&SerialPortInfo> for PortCandidate {
    fn from(info: &SerialPortInfo) -> Self {
        let mut parts = vec![info.port_name.clone()];
        if let SerialPortType::UsbPort(usb) = &info.port_type {
            parts.extend(usb.product.clone());
            parts.extend(usb.manufacturer.clone());
        }
        PortCandidate::new(&info.port_name, &parts.join(" "))
    }
}

/// First candidate that looks like the device.
pub fn pick_port(candidates: &[PortCandidate]) -> Option<&PortCandidate> {
    candidates.iter().find(|c| c.is_likely_device())
}

/// Decides which port a run talks to.
#[derive(Debug, Clone, Default)]
pub struct PortSelector {
    explicit: Option<String>,
}

impl PortSelector {
    pub fn new(explicit: Option<String>) -> Self {
        Self { explicit }
    }

    /// The port name to use, discovering one if none was given.
    pub fn resolve(&self) -> Result<String, PortError> {
        if let Some(name) = &self.explicit {
            return Ok(name.clone());
        }

        let ports = serialport::available_ports().map_err(PortError::Enumerate)?;
        let candidates: Vec<PortCandidate> = ports.iter().map(PortCandidate::from).collect();
        for c in &candidates {
            debug!("found port {} ({})", c.name, c.description);
        }

        match pick_port(&candidates) {
            Some(c) => {
                info!("auto-detected {}", c.name);
                Ok(c.name.clone())
            }
            None => Err(PortError::NoDevice {
                candidates: candidates.len(),
            }),
        }
    }
}
