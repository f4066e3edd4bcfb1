//! Non-blocking telemetry reader over a [`SerialInterface`].
use crate::serial::{SerialInterface, SerialLink, CMD_RUN_PROCEDURE, CMD_STOP_MOTOR};
use crate::session::SampleSource;

use super::buffer::{ReaderStats, SampleBuffer};
use super::{wall_clock_now, Sample};

const PARTIAL_LIMIT: usize = 8192;
const PARTIAL_KEEP: usize = 4096;

pub struct TelemetryReader {
    interface: SerialInterface,
    buffer: SampleBuffer,
    partial: Vec<u8>,
}

impl TelemetryReader {
    pub fn new(interface: SerialInterface, buffer: SampleBuffer) -> Self {
        Self {
            interface,
            buffer,
            partial: Vec::new(),
        }
    }

    /// Reader over an already-open link, mostly useful with
    /// [`ScriptedLink`](crate::serial::ScriptedLink).
    pub fn with_link(port_name: &str, link: Box<dyn SerialLink>, buffer: SampleBuffer) -> Self {
        let mut interface = SerialInterface::new();
        interface.attach(port_name, link);
        Self::new(interface, buffer)
    }

    pub fn connect(&mut self, port_name: &str) -> crate::serial::Result<()> {
        self.partial.clear();
        self.interface.connect(port_name)
    }

    pub fn disconnect(&mut self) {
        self.interface.disconnect();
        self.partial.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.interface.is_connected()
    }

    pub fn interface(&self) -> &SerialInterface {
        &self.interface
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> &ReaderStats {
        self.buffer.stats()
    }

    pub fn send_command(&mut self, command: &str) {
        self.interface.send_command(command);
    }

    pub fn stop_motor(&mut self) {
        log::info!("Stopping motor");
        self.send_command(CMD_STOP_MOTOR);
    }

    pub fn run_procedure(&mut self) {
        log::info!("Starting automated throttle procedure");
        self.send_command(CMD_RUN_PROCEDURE);
    }

    /// Drain whatever the device has already sent and return the newest
    /// sample completed by it, or `None` if nothing new completed since the
    /// last call. Never waits for more input, and read errors only mean
    /// "no sample this time".
    pub fn read_latest(&mut self) -> Option<Sample> {
        if !self.interface.is_connected() {
            return None;
        }

        let mut raw = Vec::new();
        if let Err(e) = self.interface.read_available(&mut raw) {
            log::debug!("Serial read failed, skipping cycle: {}", e);
        }

        if !raw.is_empty() {
            let stamp = wall_clock_now();
            self.partial.extend_from_slice(&raw);
            self.consume_lines(&stamp);
            self.buffer.flush_pending(&stamp);
        }

        self.buffer.take_latest()
    }

    fn consume_lines(&mut self, stamp: &str) {
        while let Some(line) = next_line(&mut self.partial) {
            self.buffer.ingest_line(&line, stamp);
        }

        if self.partial.len() > PARTIAL_LIMIT {
            let cut = self.partial.len() - PARTIAL_KEEP;
            self.partial.drain(..cut);
            self.buffer.note_partial_trim();
            log::debug!("Trimmed oversized partial line buffer");
        }
    }
}

/// Remove the first CR/LF-terminated line from `partial` and decode it.
/// Decoding waits for the terminator, so multibyte characters split across
/// reads come out intact.
fn next_line(partial: &mut Vec<u8>) -> Option<String> {
    let pos = partial.iter().position(|&b| b == b'\n' || b == b'\r')?;
    let line: Vec<u8> = partial.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line[..pos]).into_owned())
}

impl SampleSource for TelemetryReader {
    fn read_latest(&mut self) -> Option<Sample> {
        TelemetryReader::read_latest(self)
    }
}
