use std::fs;

use thrust_stand_lib::history::{
    discover_history_files, export_history, load_history_file, CsvLayout, ExportMetadata, HistoryError,
};
use thrust_stand_lib::telemetry::Sample;

fn run() -> Vec<Sample> {
    (0..5)
        .map(|i| {
            let i = f64::from(i);
            Sample {
                elapsed_time: i * 0.1,
                thrust: 100.0 + i * 10.5,
                rpm: 3000.0 + i * 250.0,
                temperature: 25.0 + i * 0.25,
                voltage: 12.0 - i * 0.1,
                current: 2.0 + i * 0.5,
                power: None,
                throttle: i * 10.0,
                wall_clock_timestamp: format!("12:00:00.{:03}", i as u32 * 100),
            }
        })
        .collect()
}

#[test]
fn test_export_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thrust_test_2024-06-01.csv");
    let meta = ExportMetadata {
        motor: "2306 2400KV".into(),
        propeller: "5x4.3".into(),
        exported: Some("2024-06-01 12:00:05".into()),
    };
    let samples = run();
    export_history(&path, Some(&meta), &samples).unwrap();

    let loaded = load_history_file(&path).unwrap();
    assert_eq!(loaded.layout, CsvLayout::Timestamped);
    assert_eq!(loaded.motor.as_deref(), Some("2306 2400KV"));
    assert_eq!(loaded.propeller.as_deref(), Some("5x4.3"));
    assert_eq!(loaded.exported.as_deref(), Some("2024-06-01 12:00:05"));
    assert_eq!(loaded.skipped_rows, 0);
    assert_eq!(loaded.samples.len(), samples.len());

    for (original, read) in samples.iter().zip(&loaded.samples) {
        assert_eq!(read.wall_clock_timestamp, original.wall_clock_timestamp);
        assert!((read.elapsed_time - original.elapsed_time).abs() < 1e-3);
        assert!((read.thrust - original.thrust).abs() < 1e-3);
        assert!((read.rpm - original.rpm).abs() < 0.1);
        assert!((read.temperature - original.temperature).abs() < 0.01);
        assert!((read.voltage - original.voltage).abs() < 1e-3);
        assert!((read.current - original.current).abs() < 1e-3);
        assert!((read.resolved_power() - original.resolved_power()).abs() < 1e-3);
        assert!((read.throttle - original.throttle).abs() < 0.1);
    }
}

#[test]
fn test_export_without_metadata_starts_with_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thrust_test_plain.csv");
    export_history(&path, None, &run()).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Timestamp,Elapsed(s)"));
    assert_eq!(load_history_file(&path).unwrap().samples.len(), 5);
}

#[test]
fn test_empty_history_is_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thrust_test_empty.csv");
    assert!(matches!(export_history(&path, None, &[]), Err(HistoryError::Empty)));
    assert!(!path.exists());
}

#[test]
fn test_exports_are_discoverable() {
    let dir = tempfile::tempdir().unwrap();
    export_history(&dir.path().join("thrust_test_2024-06-01.csv"), None, &run()).unwrap();
    fs::write(dir.path().join("summary.txt"), "notes").unwrap();
    let found = discover_history_files(dir.path()).unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("thrust_test_2024-06-01.csv"));
}

#[test]
fn test_loading_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_history_file(&dir.path().join("thrust_test_nope.csv"));
    assert!(matches!(result, Err(HistoryError::IoError(_))));
}
