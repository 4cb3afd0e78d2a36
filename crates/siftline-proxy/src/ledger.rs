//! Durable persistence for the proxy ban ledger (C10).
//!
//! Rows are appended at the moment a proxy is banned; on startup the pool
//! reads the ledger and keeps only bans whose cooldown has not yet expired.
//! Reads and appends take an advisory file lock so a ledger shared between
//! concurrent runs never observes a half-written row.

use std::fs::{File, OpenOptions};
use std::path::Path;

use chrono::Utc;
use fs4::fs_std::FileExt;
use siftline_core::{BanRecord, IngestError, IngestResult};

/// Load every ban that is still active as of now. A missing file is treated
/// as an empty ledger.
///
/// # Errors
/// Returns an error if the file exists but cannot be opened, locked, or
/// parsed as the ban-ledger CSV schema.
pub(crate) fn load_active(path: &Path) -> IngestResult<Vec<BanRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .map_err(|source| IngestError::io(format!("opening ban ledger {}", path.display()), source))?;
    file.lock_shared()
        .map_err(|source| IngestError::io("locking ban ledger for read", source))?;

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(&file);
    let now = Utc::now();
    let mut active = Vec::new();
    for row in reader.deserialize::<BanRecord>() {
        let record = row.map_err(|source| {
            IngestError::io("parsing ban ledger row", std::io::Error::other(source))
        })?;
        if record.is_active(now) {
            active.push(record);
        }
    }

    file.unlock().ok();
    Ok(active)
}

/// Append one ban record, creating the file and its header row if needed.
///
/// # Errors
/// Returns an error if the parent directory, file, or lock cannot be
/// acquired, or the row cannot be serialized.
pub(crate) fn append(path: &Path, record: &BanRecord) -> IngestResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|source| IngestError::io(format!("creating ban ledger directory {}", parent.display()), source))?;
    }

    let needs_header = std::fs::metadata(path).map(|meta| meta.len() == 0).unwrap_or(true);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| IngestError::io(format!("opening ban ledger {}", path.display()), source))?;
    file.lock_exclusive()
        .map_err(|source| IngestError::io("locking ban ledger for append", source))?;

    let mut writer = csv::WriterBuilder::new().has_headers(needs_header).from_writer(&file);
    writer
        .serialize(record)
        .map_err(|source| IngestError::io("writing ban ledger row", std::io::Error::other(source)))?;
    writer
        .flush()
        .map_err(|source| IngestError::io("flushing ban ledger", source))?;
    drop(writer);

    file.unlock().ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use siftline_core::FailureKind;
    use tempfile::tempdir;

    fn record(host: &str, expires_in: i64) -> BanRecord {
        let now = Utc::now();
        BanRecord {
            proxy_name: host.to_string(),
            proxy_host: host.to_string(),
            banned_at: now,
            expires_at: now + chrono::Duration::seconds(expires_in),
            reason: FailureKind::Ban,
            description: "3 consecutive 403s".to_string(),
        }
    }

    #[test]
    fn append_then_load_round_trips_active_bans() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proxy_bans.csv");

        append(&path, &record("10.0.0.1:8080", 3_600)).unwrap();
        append(&path, &record("10.0.0.2:8080", -10)).unwrap();

        let active = load_active(&path).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].proxy_host, "10.0.0.1:8080");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        assert!(load_active(&path).unwrap().is_empty());
    }
}
