//! Report persistence: the C9 writer half. One `ReportRow` per admitted
//! entry, written in discovery order (§4.6, §6).

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use siftline_core::{IngestError, IngestResult, ReportRow, RunMode};

/// Build the conventional dated report path from §6's persisted-state
/// layout: `reports/DailyReport/YYYY/MM/<run_id>.csv` or
/// `reports/AdHoc/YYYY/MM/<run_id>.csv`.
#[must_use]
pub fn conventional_path(reports_dir: &Path, mode: RunMode, at: DateTime<Utc>, run_id: &str) -> PathBuf {
    reports_dir
        .join(mode.report_subdir())
        .join(at.format("%Y").to_string())
        .join(at.format("%m").to_string())
        .join(format!("{run_id}.csv"))
}

/// Writes `ReportRow`s to a fresh CSV file, one header row.
///
/// The scraper owns the report file for the duration of a run (§5); unlike
/// the history store and ban ledger it is not a merge target, so there is no
/// load-then-rewrite step here, just a single streaming writer.
pub struct ReportWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl ReportWriter {
    /// Create (or truncate) the report file at `path`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    /// Returns an error if the parent directory or file cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> IngestResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|source| IngestError::io(format!("creating report directory {}", parent.display()), source))?;
        }
        let file = File::create(&path)
            .map_err(|source| IngestError::io(format!("creating report {}", path.display()), source))?;
        let writer = csv::WriterBuilder::new().has_headers(true).from_writer(file);
        Ok(Self { path, writer })
    }

    /// The path this writer is targeting.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row.
    ///
    /// # Errors
    /// Returns an error if the row cannot be serialized or written.
    pub fn write_row(&mut self, row: &ReportRow) -> IngestResult<()> {
        self.writer
            .serialize(row)
            .map_err(|source| IngestError::io("writing report row", std::io::Error::other(source)))
    }

    /// Flush buffered output to disk.
    ///
    /// # Errors
    /// Returns an error if the final flush fails.
    pub fn finish(mut self) -> IngestResult<()> {
        self.writer.flush().map_err(|source| IngestError::io("flushing report", source))
    }
}
