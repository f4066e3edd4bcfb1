pub mod interface;
pub mod link;

pub use interface::{list_ports, SerialInterface};
pub use link::{ScriptedLink, SerialLink};

use serde::{Deserialize, Serialize};

/// Outbound command that halts the motor immediately.
pub const CMD_STOP_MOTOR: &str = "s";
/// Outbound command that starts the automated throttle ramp.
pub const CMD_RUN_PROCEDURE: &str = "procedure";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortEntry {
    pub port_name: String,
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("No port specified")]
    NoPortSpecified,

    #[error("Port {0} is already in use. Close any serial monitor or other program using this port.")]
    PortBusy(String),

    #[error("Failed to connect to {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Not connected")]
    NotConnected,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;
