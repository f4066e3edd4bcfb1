use serde::{Deserialize, Serialize};

use crate::telemetry::Sample;

/// Peak values over one run, for the end-of-test report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub samples: usize,
    pub duration_s: f64,
    pub peak_thrust: f64,
    pub peak_rpm: f64,
    pub peak_power: f64,
    pub max_temperature: f64,
    pub max_throttle: f64,
}

impl SessionSummary {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Self::default();
        };
        let peak = |f: fn(&Sample) -> f64| samples.iter().map(f).fold(f64::NEG_INFINITY, f64::max);
        Self {
            samples: samples.len(),
            duration_s: last.elapsed_time - first.elapsed_time,
            peak_thrust: peak(|s| s.thrust),
            peak_rpm: peak(|s| s.rpm),
            peak_power: peak(Sample::resolved_power),
            max_temperature: peak(|s| s.temperature),
            max_throttle: peak(|s| s.throttle),
        }
    }
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.samples == 0 {
            return write!(f, "No samples recorded");
        }
        write!(
            f,
            "{} samples over {:.1} s | peak thrust {:.2} g | peak RPM {:.1} | peak power {:.2} W | max temp {:.1} °C | max throttle {:.1} %",
            self.samples,
            self.duration_s,
            self.peak_thrust,
            self.peak_rpm,
            self.peak_power,
            self.max_temperature,
            self.max_throttle,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_summarizes_to_zero() {
        let summary = SessionSummary::from_samples(&[]);
        assert_eq!(summary, SessionSummary::default());
        assert_eq!(summary.to_string(), "No samples recorded");
    }

    #[test]
    fn peaks_are_tracked() {
        let samples = vec![
            Sample { elapsed_time: 0.5, thrust: 10.0, rpm: 1000.0, voltage: 12.0, current: 1.0, ..Default::default() },
            Sample { elapsed_time: 2.5, thrust: 30.0, rpm: 800.0, voltage: 12.0, current: 3.0, temperature: 40.0, ..Default::default() },
        ];
        let summary = SessionSummary::from_samples(&samples);
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.duration_s, 2.0);
        assert_eq!(summary.peak_thrust, 30.0);
        assert_eq!(summary.peak_rpm, 1000.0);
        assert_eq!(summary.peak_power, 36.0);
        assert_eq!(summary.max_temperature, 40.0);
    }
}
