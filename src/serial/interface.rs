use std::io;
use std::thread;
use std::time::Duration;

use serialport::SerialPortType;

use super::link::SerialLink;
use super::{Result, SerialError, SerialPortEntry};

pub const BAUD_RATE: u32 = 9600;
/// The board resets when the port opens; give it time before reading.
pub const SETTLE_DELAY: Duration = Duration::from_millis(2000);
pub const READ_TIMEOUT: Duration = Duration::from_millis(200);
const REOPEN_DELAY: Duration = Duration::from_millis(500);
const READ_CHUNK: usize = 512;

/// List the serial ports visible to the OS.
pub fn list_ports() -> Result<Vec<SerialPortEntry>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let description = match port.port_type {
                SerialPortType::UsbPort(usb_info) => usb_info.product.or(usb_info.manufacturer),
                SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
                _ => None,
            };
            SerialPortEntry { port_name: port.port_name, description }
        })
        .collect())
}

/// Whether an open failure means another program holds the port.
pub(crate) fn is_port_busy(err: &serialport::Error) -> bool {
    if let serialport::ErrorKind::Io(kind) = err.kind() {
        if kind == io::ErrorKind::PermissionDenied {
            return true;
        }
    }
    let description = err.description.to_lowercase();
    ["access is denied", "permission denied", "busy", "in use"]
        .iter()
        .any(|needle| description.contains(needle))
}

pub struct SerialInterface {
    link: Option<Box<dyn SerialLink>>,
    port_name: Option<String>,
    baud_rate: u32,
    settle_delay: Duration,
}

impl SerialInterface {
    pub fn new() -> Self {
        Self {
            link: None,
            port_name: None,
            baud_rate: BAUD_RATE,
            settle_delay: SETTLE_DELAY,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Open `port_name`, wait for the board to reset and drop its startup noise.
    pub fn connect(&mut self, port_name: &str) -> Result<()> {
        if port_name.trim().is_empty() {
            return Err(SerialError::NoPortSpecified);
        }

        if self.is_connected() {
            self.disconnect();
            thread::sleep(REOPEN_DELAY);
        }

        let port = serialport::new(port_name, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| {
                if is_port_busy(&e) {
                    SerialError::PortBusy(port_name.to_string())
                } else {
                    SerialError::OpenFailed {
                        port: port_name.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        thread::sleep(self.settle_delay);
        self.attach(port_name, Box::new(port));
        log::info!("Connected to thrust stand on {} at {} baud", port_name, self.baud_rate);
        Ok(())
    }

    /// Take ownership of an already-open link, clearing any stale input.
    pub fn attach(&mut self, port_name: &str, mut link: Box<dyn SerialLink>) {
        if let Err(e) = link.clear_input() {
            log::debug!("Could not clear input on {}: {}", port_name, e);
        }
        self.link = Some(link);
        self.port_name = Some(port_name.to_string());
    }

    /// Close the link. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if let Some(port_name) = self.port_name.take() {
            log::info!("Disconnecting from {}", port_name);
        }
        self.link = None;
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Write `command` followed by a newline. No acknowledgement is expected,
    /// and write failures are only logged.
    pub fn send_command(&mut self, command: &str) {
        let Some(link) = self.link.as_mut() else {
            log::warn!("Dropping command '{}': not connected", command);
            return;
        };
        let line = format!("{}\n", command);
        match link.write_all(line.as_bytes()) {
            Ok(()) => log::debug!("Sent command '{}'", command),
            Err(e) => log::warn!("Failed to send command '{}': {}", command, e),
        }
    }

    /// Append every byte already waiting on the link to `out`. Never waits
    /// for more data to arrive.
    pub fn read_available(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let link = self.link.as_mut().ok_or(SerialError::NotConnected)?;
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            let waiting = link.bytes_to_read()? as usize;
            if waiting == 0 {
                break;
            }
            let want = waiting.min(READ_CHUNK);
            let n = match link.read(&mut chunk[..want]) {
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(SerialError::IoError(e)),
            };
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
            total += n;
        }
        Ok(total)
    }
}

impl Default for SerialInterface {
    fn default() -> Self {
        Self::new()
    }
}
