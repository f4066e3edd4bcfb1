//! Byte-level transport underneath [`SerialInterface`](super::SerialInterface).
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use serialport::{ClearBuffer, SerialPort};

/// The operations the telemetry reader needs from an open serial port.
pub trait SerialLink: Send {
    /// Number of bytes already received and waiting to be read.
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Discard anything received but not yet read.
    fn clear_input(&mut self) -> io::Result<()>;
}

impl SerialLink for Box<dyn SerialPort> {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        SerialPort::bytes_to_read(self.as_ref()).map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(self, data)?;
        Write::flush(self)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

#[derive(Debug, Default)]
struct ScriptedState {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    fail_reads: bool,
}

/// In-memory link fed by hand, for exercising the reader without hardware.
///
/// Clones share the same buffers, so a test can keep one handle while the
/// interface owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLink {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue bytes as if the device had just sent them.
    pub fn push(&self, data: &str) {
        self.state().incoming.extend(data.bytes());
    }

    /// Queue raw bytes, which need not be valid UTF-8 on their own.
    pub fn push_bytes(&self, data: &[u8]) {
        self.state().incoming.extend(data.iter().copied());
    }

    /// Everything written to the link so far, lossily decoded.
    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.state().written).into_owned()
    }

    pub fn pending(&self) -> usize {
        self.state().incoming.len()
    }

    /// Make subsequent reads fail with a broken-pipe error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }
}

impl SerialLink for ScriptedLink {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        let state = self.state();
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link failure"));
        }
        Ok(u32::try_from(state.incoming.len()).unwrap_or(u32::MAX))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link failure"));
        }
        let n = buf.len().min(state.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.state().written.extend_from_slice(data);
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.state().incoming.clear();
        Ok(())
    }
}
