//! Persistent settings, read from `thrust_stand.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! Command-line flags are applied on top with [`Settings::apply_overrides`].
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};
use crate::serial::interface::{BAUD_RATE, SETTLE_DELAY};
use crate::session::POLL_INTERVAL;
use crate::telemetry::{DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY};

pub const SETTINGS_FILE_NAME: &str = "thrust_stand.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Serial port of the stand, e.g. `COM3` or `/dev/ttyACM0`.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub poll_interval_ms: u64,
    /// Wait after opening the port while the board resets.
    pub settle_delay_ms: u64,
    /// Number of recent samples kept by the reader.
    pub buffer_capacity: usize,
    /// Where exports are written and history files are searched for.
    pub history_dir: PathBuf,
    pub motor: String,
    pub propeller: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: BAUD_RATE,
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
            settle_delay_ms: SETTLE_DELAY.as_millis() as u64,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            history_dir: PathBuf::from("."),
            motor: String::new(),
            propeller: String::new(),
        }
    }
}

/// Values supplied on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub history_dir: Option<PathBuf>,
    pub motor: Option<String>,
    pub propeller: Option<String>,
}

impl Settings {
    /// Load `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let settings = Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.to_path_buf(), source },
            other => other,
        })?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| ConfigError::Parse { path: PathBuf::new(), source })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if !(1..=MAX_BUFFER_CAPACITY).contains(&self.buffer_capacity) {
            return Err(ConfigError::Invalid(format!(
                "buffer_capacity must be between 1 and {}",
                MAX_BUFFER_CAPACITY
            )));
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: SettingsOverrides) {
        if overrides.port.is_some() {
            self.port = overrides.port;
        }
        if let Some(baud_rate) = overrides.baud_rate {
            self.baud_rate = baud_rate;
        }
        if let Some(dir) = overrides.history_dir {
            self.history_dir = dir;
        }
        if let Some(motor) = overrides.motor {
            self.motor = motor;
        }
        if let Some(propeller) = overrides.propeller {
            self.propeller = propeller;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_wire_protocol() {
        let settings = Settings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.poll_interval_ms, 100);
        assert_eq!(settings.settle_delay_ms, 2000);
        assert_eq!(settings.buffer_capacity, 100);
    }

    #[test]
    fn test_partial_file() {
        let settings = Settings::from_toml("port = \"/dev/ttyACM0\"\nmotor = \"A2212\"\n").unwrap();
        assert_eq!(settings.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(settings.motor, "A2212");
        assert_eq!(settings.baud_rate, 9600);
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(Settings::from_toml("baud_rate = \"fast\""), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join(SETTINGS_FILE_NAME)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let mut settings = Settings::default();
        settings.port = Some("COM4".into());
        settings.propeller = "9x4.7".into();
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "poll_interval_ms = 0\n").unwrap();
        assert!(matches!(Settings::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_overrides() {
        let mut settings = Settings { port: Some("COM1".into()), ..Default::default() };
        settings.apply_overrides(SettingsOverrides {
            motor: Some("T-Motor".into()),
            ..Default::default()
        });
        assert_eq!(settings.port.as_deref(), Some("COM1"));
        assert_eq!(settings.motor, "T-Motor");
        settings.apply_overrides(SettingsOverrides { port: Some("COM9".into()), ..Default::default() });
        assert_eq!(settings.port.as_deref(), Some("COM9"));
    }

    #[test]
    fn test_buffer_capacity_bounds() {
        let huge = Settings::from_toml("buffer_capacity = 9223372036854775807\n").unwrap();
        assert!(matches!(huge.validate(), Err(ConfigError::Invalid(_))));
        let zero = Settings { buffer_capacity: 0, ..Default::default() };
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));
        let max = Settings { buffer_capacity: MAX_BUFFER_CAPACITY, ..Default::default() };
        assert!(max.validate().is_ok());
    }
}
