//! Report reader/rewriter: the C9 reader/annotator half. Loads the whole
//! report into memory, lets the engine mutate rows in place, then rewrites
//! the file atomically (write-temp-then-rename), mirroring how the history
//! store commits its own table.

use std::fs::File;
use std::path::Path;

use siftline_core::{IngestError, IngestResult, ReportRow};

/// Read every row of a report.
///
/// # Errors
/// Returns an error if the file cannot be opened or a row fails to parse.
pub fn read_rows(path: &Path) -> IngestResult<Vec<ReportRow>> {
    let file =
        File::open(path).map_err(|source| IngestError::io(format!("opening report {}", path.display()), source))?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
    reader
        .deserialize::<ReportRow>()
        .map(|row| row.map_err(|source| IngestError::io("parsing report row", std::io::Error::other(source))))
        .collect()
}

/// Rewrite `rows` to `path` atomically.
///
/// # Errors
/// Returns an error if the temporary file cannot be written, synced, or
/// renamed into place.
pub fn write_rows_atomic(path: &Path, rows: &[ReportRow]) -> IngestResult<()> {
    let tmp_path = path.with_extension("csv.tmp");
    {
        let file = File::create(&tmp_path)
            .map_err(|source| IngestError::io(format!("creating {}", tmp_path.display()), source))?;
        let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(&file);
        for row in rows {
            writer
                .serialize(row)
                .map_err(|source| IngestError::io("writing report row", std::io::Error::other(source)))?;
        }
        writer.flush().map_err(|source| IngestError::io("flushing report", source))?;
        drop(writer);
        file.sync_all().map_err(|source| IngestError::io("fsyncing report", source))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|source| IngestError::io("renaming report into place", source))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use siftline_core::TorrentType;
    use tempfile::tempdir;

    fn row(href: &str) -> ReportRow {
        ReportRow {
            href: href.into(),
            video_code: "ABC-123".into(),
            title: "Title".into(),
            page: 1,
            actor: None,
            rating: None,
            comment_count: None,
            magnets: ["magnet:?xt=urn:btih:abc".into(), String::new(), String::new(), String::new()],
            sizes: ["1.5 GB".into(), String::new(), String::new(), String::new()],
        }
    }

    #[test]
    fn write_then_read_round_trips_a_mutated_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_rows_atomic(&path, &[row("/detail/1")]).unwrap();

        let mut rows = read_rows(&path).unwrap();
        rows[0].mark_downloaded(TorrentType::HackedSubtitle);
        write_rows_atomic(&path, &rows).unwrap();

        let reread = read_rows(&path).unwrap();
        assert!(reread[0].is_marked_downloaded(TorrentType::HackedSubtitle));
    }
}
