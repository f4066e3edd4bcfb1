//! Thrust stand telemetry: line classification, the sample ring buffer and
//! the non-blocking reader that ties them to a serial link.
pub mod buffer;
pub mod parser;
pub mod reader;

pub use buffer::{ReaderStats, SampleBuffer, DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY};
pub use parser::{classify_line, Field, LineKind};
pub use reader::TelemetryReader;

use serde::{Deserialize, Serialize};

/// One telemetry reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds. Device clock when freshly parsed, session clock once the
    /// sample has been appended to a session history.
    pub elapsed_time: f64,
    /// Grams.
    pub thrust: f64,
    pub rpm: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    pub voltage: f64,
    pub current: f64,
    /// Watts, when the device transmitted it.
    pub power: Option<f64>,
    /// Percent.
    pub throttle: f64,
    /// Local capture time, `HH:MM:SS.mmm`.
    pub wall_clock_timestamp: String,
}

impl Sample {
    /// Transmitted power, or `voltage * current` when none was sent.
    pub fn resolved_power(&self) -> f64 {
        self.power.unwrap_or(self.voltage * self.current)
    }

    pub fn set_field(&mut self, field: Field, value: f64) {
        match field {
            Field::Thrust => self.thrust = value,
            Field::Temperature => self.temperature = value,
            Field::Rpm => self.rpm = value,
            Field::Voltage => self.voltage = value,
            Field::Current => self.current = value,
        }
    }

    /// Human readable readout, one label per measurement.
    pub fn readout(&self) -> String {
        format!(
            "Time: {}  Thrust: {:.2} g  RPM: {:.1} RPM  Temp: {:.1} °C  Voltage: {:.2} V  Current: {:.3} A  Power: {:.2} W  Throttle: {:.1} %",
            self.wall_clock_timestamp,
            self.thrust,
            self.rpm,
            self.temperature,
            self.voltage,
            self.current,
            self.resolved_power(),
            self.throttle,
        )
    }
}

/// Local wall-clock time with millisecond precision.
pub fn wall_clock_now() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}
