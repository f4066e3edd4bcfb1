//! Acquisition session: owns the per-run history and its lifecycle.
pub mod poller;
pub mod summary;

pub use poller::{poll_until, POLL_INTERVAL};
pub use summary::SessionSummary;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::telemetry::{wall_clock_now, Sample};

/// Anything that can answer "newest sample since you last asked".
pub trait SampleSource {
    fn read_latest(&mut self) -> Option<Sample>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
pub struct AcquisitionSession {
    state: SessionState,
    started_at: Option<Instant>,
    history: Vec<Sample>,
}

impl AcquisitionSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            started_at: None,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Begin a new run. Any previous history is discarded.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        self.history.clear();
        self.started_at = Some(now);
        self.state = SessionState::Running;
        log::info!("Test started");
    }

    /// Halt the run. The history stays readable until the next start.
    pub fn stop(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.state = SessionState::Stopped;
        log::info!("Test stopped with {} samples", self.history.len());
    }

    /// One poll step. Returns true when a sample was appended.
    pub fn tick<S: SampleSource + ?Sized>(&mut self, source: &mut S) -> bool {
        self.tick_at(Instant::now(), source)
    }

    pub fn tick_at<S: SampleSource + ?Sized>(&mut self, now: Instant, source: &mut S) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        let Some(started_at) = self.started_at else {
            return false;
        };
        let elapsed = now.saturating_duration_since(started_at).as_secs_f64();

        let Some(sample) = source.read_latest() else {
            return false;
        };

        let wall_clock_timestamp = if sample.wall_clock_timestamp.is_empty() {
            wall_clock_now()
        } else {
            sample.wall_clock_timestamp.clone()
        };
        let power = sample.resolved_power();
        self.history.push(Sample {
            elapsed_time: elapsed,
            power: Some(power),
            wall_clock_timestamp,
            ..sample
        });
        true
    }

    pub fn history(&self) -> &[Sample] {
        &self.history
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.history.last()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_samples(&self.history)
    }
}

impl Default for AcquisitionSession {
    fn default() -> Self {
        Self::new()
    }
}
