use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::Result;

pub const HISTORY_FILE_PREFIX: &str = "thrust_test_";
pub const HISTORY_FILE_SUFFIX: &str = ".csv";

fn is_history_file(name: &str) -> bool {
    name.len() >= HISTORY_FILE_PREFIX.len() + HISTORY_FILE_SUFFIX.len()
        && name.starts_with(HISTORY_FILE_PREFIX)
        && name.ends_with(HISTORY_FILE_SUFFIX)
}

/// Saved tests (`thrust_test_*.csv`) in `dir`, most recently modified first.
pub fn discover_history_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_history_file(name) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                log::debug!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        found.push((modified, entry.path()));
    }

    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}
