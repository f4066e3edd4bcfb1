use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};

use super::{HistoryError, Result, HISTORY_FILE_PREFIX, HISTORY_FILE_SUFFIX};
use crate::telemetry::Sample;

pub const EXPORT_HEADER: [&str; 9] = [
    "Timestamp",
    "Elapsed(s)",
    "Thrust(g)",
    "RPM",
    "Temperature(°C)",
    "Voltage(V)",
    "Current(A)",
    "Power(W)",
    "Throttle(%)",
];

/// Free-form rows written above the data header.
#[derive(Debug, Clone, Default)]
pub struct ExportMetadata {
    pub motor: String,
    pub propeller: String,
    /// `YYYY-MM-DD HH:MM:SS`; filled with the current time when `None`.
    pub exported: Option<String>,
}

/// `thrust_test_<YYYY-MM-DD>.csv`
pub fn default_file_name(date: NaiveDate) -> String {
    format!("{}{}{}", HISTORY_FILE_PREFIX, date.format("%Y-%m-%d"), HISTORY_FILE_SUFFIX)
}

/// `thrust_test_<YYYY-MM-DD>_<HHMMSS>.csv`, used when the day's file exists.
pub fn timestamped_file_name(at: NaiveDateTime) -> String {
    format!("{}{}{}", HISTORY_FILE_PREFIX, at.format("%Y-%m-%d_%H%M%S"), HISTORY_FILE_SUFFIX)
}

/// Write `samples` as CSV to `out`, preceded by the metadata block if given.
pub fn write_history<W: Write>(mut out: W, metadata: Option<&ExportMetadata>, samples: &[Sample]) -> Result<()> {
    if let Some(meta) = metadata {
        let exported = meta
            .exported
            .clone()
            .unwrap_or_else(|| Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        {
            let mut meta_writer = csv::WriterBuilder::new().flexible(true).from_writer(&mut out);
            meta_writer.write_record(["Motor", meta.motor.as_str()])?;
            meta_writer.write_record(["Propeller", meta.propeller.as_str()])?;
            meta_writer.write_record(["Exported", exported.as_str()])?;
            meta_writer.flush()?;
        }
        out.write_all(b"\n")?;
    }

    let mut writer = csv::Writer::from_writer(&mut out);
    writer.write_record(EXPORT_HEADER)?;
    for s in samples {
        writer.write_record([
            s.wall_clock_timestamp.clone(),
            format!("{:.3}", s.elapsed_time),
            format!("{:.3}", s.thrust),
            format!("{:.1}", s.rpm),
            format!("{:.2}", s.temperature),
            format!("{:.3}", s.voltage),
            format!("{:.3}", s.current),
            format!("{:.3}", s.resolved_power()),
            format!("{:.1}", s.throttle),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `samples` to `path`, replacing whatever is there. An empty history
/// is refused.
pub fn export_history(path: &Path, metadata: Option<&ExportMetadata>, samples: &[Sample]) -> Result<()> {
    if samples.is_empty() {
        return Err(HistoryError::Empty);
    }
    write_file(File::create(path)?, path, metadata, samples)
}

/// Export into `dir` under the default name for `at`, never touching an
/// existing file: the day's name is tried first, then a time-suffixed one,
/// then numbered variants of that. Returns the path written.
pub fn export_new_history(
    dir: &Path,
    at: NaiveDateTime,
    metadata: Option<&ExportMetadata>,
    samples: &[Sample],
) -> Result<PathBuf> {
    if samples.is_empty() {
        return Err(HistoryError::Empty);
    }
    let stamped = timestamped_file_name(at);
    let stem = stamped.trim_end_matches(HISTORY_FILE_SUFFIX);
    let candidates = [default_file_name(at.date()), stamped.clone()]
        .into_iter()
        .chain((2..100).map(|n| format!("{}_{}{}", stem, n, HISTORY_FILE_SUFFIX)));

    for name in candidates {
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                write_file(file, &path, metadata, samples)?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::debug!("{} exists, trying another name", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(HistoryError::NoFreeName(dir.display().to_string()))
}

fn write_file(file: File, path: &Path, metadata: Option<&ExportMetadata>, samples: &[Sample]) -> Result<()> {
    let mut out = BufWriter::new(file);
    write_history(&mut out, metadata, samples)?;
    out.flush()?;
    log::info!("Exported {} samples to {}", samples.len(), path.display());
    Ok(())
}
