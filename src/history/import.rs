use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{HistoryError, Result};
use crate::telemetry::Sample;

/// Column layout of a saved test, decided by the header's first cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsvLayout {
    /// `Timestamp, Elapsed, Thrust, RPM, Temp, Voltage, Current, Power[, Throttle]`
    Timestamped,
    /// `Time, Thrust, RPM, Temp, Voltage, Current[, Power][, Throttle]`
    Legacy,
}

impl CsvLayout {
    fn detect(first_cell: &str) -> Option<Self> {
        let first = first_cell.trim().to_lowercase();
        if first.starts_with("timestamp") {
            Some(CsvLayout::Timestamped)
        } else if first.starts_with("time") {
            Some(CsvLayout::Legacy)
        } else {
            None
        }
    }

    /// Index of the elapsed-time column; measurements follow it.
    fn time_column(self) -> usize {
        match self {
            CsvLayout::Timestamped => 1,
            CsvLayout::Legacy => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedHistory {
    pub layout: CsvLayout,
    pub motor: Option<String>,
    pub propeller: Option<String>,
    pub exported: Option<String>,
    pub samples: Vec<Sample>,
    /// Data rows that could not be parsed.
    pub skipped_rows: usize,
}

pub fn load_history_file(path: &Path) -> Result<LoadedHistory> {
    let file = File::open(path)?;
    let history = read_history(file, &path.display().to_string())?;
    log::info!(
        "Loaded {} samples ({:?} layout) from {}",
        history.samples.len(),
        history.layout,
        path.display()
    );
    Ok(history)
}

/// Parse a saved test from any reader. `source` names it in errors.
pub fn read_history<R: Read>(reader: R, source: &str) -> Result<LoadedHistory> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut layout = None;
    let mut columns = Columns::default();
    let mut motor = None;
    let mut propeller = None;
    let mut exported = None;
    let mut samples = Vec::new();
    let mut skipped_rows = 0;

    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::debug!("Skipping unreadable row in {}: {}", source, e);
                skipped_rows += 1;
                continue;
            }
        };
        let row: Vec<&str> = record.iter().map(str::trim).collect();
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let Some(current_layout) = layout else {
            if let Some(detected) = CsvLayout::detect(row[0]) {
                layout = Some(detected);
                columns = Columns::locate(&row, detected);
            } else {
                let value = row.get(1).map(|v| v.to_string());
                match row[0].to_lowercase().as_str() {
                    "motor" => motor = value,
                    "propeller" => propeller = value,
                    "exported" => exported = value,
                    _ => {}
                }
            }
            continue;
        };

        match parse_row(&row, current_layout, columns) {
            Some(sample) => samples.push(sample),
            None => skipped_rows += 1,
        }
    }

    let layout = layout.ok_or_else(|| HistoryError::MissingHeader(source.to_string()))?;
    Ok(LoadedHistory { layout, motor, propeller, exported, samples, skipped_rows })
}

/// Where power and throttle live. Named headers win; unnamed headers fall
/// back to the standard positions, as long as those hold something else.
#[derive(Debug, Clone, Copy, Default)]
struct Columns {
    power: Option<usize>,
    throttle: Option<usize>,
}

impl Columns {
    fn locate(header: &[&str], layout: CsvLayout) -> Self {
        let t = layout.time_column();
        let named = |name: &str| header.iter().position(|h| h.to_lowercase().contains(name));
        let throttle = named("throttle").or(Some(t + 7));
        let power = named("power").or_else(|| Some(t + 6).filter(|&i| i < header.len() && Some(i) != throttle));
        Self { power, throttle }
    }
}

fn cell(row: &[&str], index: usize) -> Option<Option<f64>> {
    match row.get(index) {
        None => Some(None),
        Some(text) if text.is_empty() => Some(None),
        Some(text) => text.parse::<f64>().ok().map(Some),
    }
}

/// `None` when the row is malformed or has no elapsed time.
fn parse_row(row: &[&str], layout: CsvLayout, columns: Columns) -> Option<Sample> {
    let t = layout.time_column();
    let elapsed_time = cell(row, t)??;
    let measure = |offset: usize| cell(row, t + offset).map(|v| v.unwrap_or(0.0));

    let throttle = match columns.throttle {
        Some(index) => cell(row, index)?.unwrap_or(0.0),
        None => 0.0,
    };
    let power = match columns.power {
        Some(index) => cell(row, index)?,
        None => None,
    };

    let wall_clock_timestamp = match layout {
        CsvLayout::Timestamped => row[0].to_string(),
        CsvLayout::Legacy => String::new(),
    };

    Some(Sample {
        elapsed_time,
        thrust: measure(1)?,
        rpm: measure(2)?,
        temperature: measure(3)?,
        voltage: measure(4)?,
        current: measure(5)?,
        power,
        throttle,
        wall_clock_timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamped_layout_with_metadata() {
        let text = "Motor,X2212\nPropeller,10x4.5\nExported,2024-05-01 09:00:00\n\n\
Timestamp,Elapsed(s),Thrust(g),RPM,Temperature(°C),Voltage(V),Current(A),Power(W),Throttle(%)\n\
09:00:01.000,0.100,12.500,1000.0,25.00,12.000,1.000,12.000,10.0\n\
09:00:01.100,0.200,13.500,1100.0,25.10,11.900,1.100,13.090,12.5\n";
        let loaded = read_history(text.as_bytes(), "mem").unwrap();
        assert_eq!(loaded.layout, CsvLayout::Timestamped);
        assert_eq!(loaded.motor.as_deref(), Some("X2212"));
        assert_eq!(loaded.propeller.as_deref(), Some("10x4.5"));
        assert_eq!(loaded.exported.as_deref(), Some("2024-05-01 09:00:00"));
        assert_eq!(loaded.samples.len(), 2);
        let s = &loaded.samples[1];
        assert_eq!(s.wall_clock_timestamp, "09:00:01.100");
        assert_eq!(s.elapsed_time, 0.2);
        assert_eq!(s.thrust, 13.5);
        assert_eq!(s.rpm, 1100.0);
        assert_eq!(s.temperature, 25.1);
        assert_eq!(s.voltage, 11.9);
        assert_eq!(s.current, 1.1);
        assert_eq!(s.power, Some(13.09));
        assert_eq!(s.throttle, 12.5);
    }

    #[test]
    fn test_legacy_layout_without_power_or_throttle() {
        let text = "Time (s),Thrust (g),RPM,Temperature (°C),Voltage (V),Current (A)\n\
0.5,100,2000,30,12,2\n\
1.0,110,2100,31,12,3\n";
        let loaded = read_history(text.as_bytes(), "mem").unwrap();
        assert_eq!(loaded.layout, CsvLayout::Legacy);
        assert_eq!(loaded.samples.len(), 2);
        let s = &loaded.samples[1];
        assert_eq!(s.elapsed_time, 1.0);
        assert_eq!(s.power, None);
        assert_eq!(s.resolved_power(), 36.0);
        assert_eq!(s.throttle, 0.0);
        assert!(s.wall_clock_timestamp.is_empty());
    }

    #[test]
    fn test_throttle_located_by_name() {
        let text = "time,thrust,rpm,temp,voltage,current,throttle\n1,2,3,4,5,6,70\n";
        let loaded = read_history(text.as_bytes(), "mem").unwrap();
        let s = &loaded.samples[0];
        assert_eq!(s.throttle, 70.0);
        assert_eq!(s.current, 6.0);
        assert_eq!(s.power, None);
        assert_eq!(s.resolved_power(), 30.0);
    }

    #[test]
    fn test_power_located_by_name() {
        let text = "Timestamp,Elapsed(s),Thrust(g),RPM,Temperature(°C),Voltage(V),Current(A),Throttle(%),Power(W)\n\
10:00:00.000,1,2,3,4,12,2,55,23.5\n";
        let loaded = read_history(text.as_bytes(), "mem").unwrap();
        let s = &loaded.samples[0];
        assert_eq!(s.throttle, 55.0);
        assert_eq!(s.power, Some(23.5));
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let text = "time,thrust,rpm,temp,voltage,current,power\n1,2,3,4,5,6,7\nabc,2,3,4,5,6,7\n2,x,3,4,5,6,7\n,1,1,1,1,1,1\n";
        let loaded = read_history(text.as_bytes(), "mem").unwrap();
        assert_eq!(loaded.samples.len(), 1);
        assert_eq!(loaded.skipped_rows, 3);
    }

    #[test]
    fn test_empty_cells_default_to_zero() {
        let text = "Timestamp,Elapsed(s),Thrust(g),RPM\n10:00:00.000,1.5,,\n";
        let loaded = read_history(text.as_bytes(), "mem").unwrap();
        let s = &loaded.samples[0];
        assert_eq!(s.elapsed_time, 1.5);
        assert_eq!(s.thrust, 0.0);
        assert_eq!(s.rpm, 0.0);
        assert_eq!(s.resolved_power(), 0.0);
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let text = "Motor,abc\n1,2,3\n";
        assert!(matches!(read_history(text.as_bytes(), "mem"), Err(HistoryError::MissingHeader(_))));
    }
}
