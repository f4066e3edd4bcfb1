//! Test-run persistence: CSV export, re-import and file discovery.
pub mod discovery;
pub mod export;
pub mod import;

pub use discovery::{discover_history_files, HISTORY_FILE_PREFIX, HISTORY_FILE_SUFFIX};
pub use export::{
    default_file_name, export_history, export_new_history, timestamped_file_name, write_history, ExportMetadata,
    EXPORT_HEADER,
};
pub use import::{load_history_file, read_history, CsvLayout, LoadedHistory};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("No data to export. Run a test first.")]
    Empty,

    #[error("No unused file name left in {0}")]
    NoFreeName(String),

    #[error("No data header found in {0}")]
    MissingHeader(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
