//! The history store itself: load, query, merge, and commit (§4.5).

use std::collections::{BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use siftline_core::{Entry, IngestError, IngestResult, Phase, TorrentType};

use crate::row::{HistoryRow, LegacyHistoryRow, CURRENT_SCHEMA_MARKER};
use siftline_core::HistoryRecord;

/// Per-call overrides to the `should_process` admission rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryOverrides {
    /// Force every `TorrentType` to be reprocessed regardless of history.
    pub ignore_history: bool,
}

/// A CSV-backed table of `HistoryRecord`s keyed by `href`.
///
/// `open` takes an exclusive advisory lock on the backing file for the
/// lifetime of the store and loads the whole table into memory; `commit`
/// rewrites the file, fsyncs, and releases the lock. Multi-process sharing
/// is out of scope (§4.5) — the lock exists to protect against a second
/// accidental invocation against the same file, not concurrent writers.
pub struct HistoryStore {
    path: PathBuf,
    records: HashMap<String, HistoryRecord>,
    lock: Option<File>,
}

impl HistoryStore {
    /// Open (or create) the history table at `path`.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be locked, read, or
    /// parsed under either the current or legacy schema.
    pub fn open(path: impl Into<PathBuf>) -> IngestResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|source| IngestError::io(format!("creating history directory {}", parent.display()), source))?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| IngestError::io(format!("opening history table {}", path.display()), source))?;
        lock_file
            .lock_exclusive()
            .map_err(|source| IngestError::io("locking history table", source))?;

        let records = load_records(&path)?;

        Ok(Self { path, records, lock: Some(lock_file) })
    }

    /// Look up the record for `href`, if one exists.
    #[must_use]
    pub fn lookup(&self, href: &str) -> Option<&HistoryRecord> {
        self.records.get(href)
    }

    /// The set of `TorrentType`s the scraper should still try to obtain for
    /// `entry` in `phase` (§4.5).
    #[must_use]
    pub fn should_process(&self, entry: &Entry, phase: Phase, overrides: HistoryOverrides) -> BTreeSet<TorrentType> {
        if overrides.ignore_history {
            return TorrentType::ALL.into_iter().collect();
        }

        let Some(record) = self.lookup(&entry.href) else {
            return match phase {
                Phase::One => [TorrentType::HackedSubtitle, TorrentType::Subtitle].into_iter().collect(),
                Phase::Two => [TorrentType::HackedNoSubtitle].into_iter().collect(),
            };
        };

        match phase {
            Phase::One => [TorrentType::HackedSubtitle, TorrentType::Subtitle]
                .into_iter()
                .filter(|&kind| !record.is_downloaded(kind))
                .collect(),
            Phase::Two => {
                if record.is_downloaded(TorrentType::NoSubtitle) && !record.is_downloaded(TorrentType::HackedNoSubtitle) {
                    [TorrentType::HackedNoSubtitle].into_iter().collect()
                } else {
                    BTreeSet::new()
                }
            }
        }
    }

    /// Whether `kind` has already been recorded as downloaded for `href`.
    #[must_use]
    pub fn is_downloaded(&self, href: &str, kind: TorrentType) -> bool {
        self.lookup(href).is_some_and(|record| record.is_downloaded(kind))
    }

    /// Create the record for `entry` if absent (with `phase` and
    /// `create_date` = `at`), set each of `selected_types`' columns to `at`
    /// if not already set, and bump `update_date`. Never clears an existing
    /// non-null column.
    pub fn merge(&mut self, entry: &Entry, phase: Phase, selected_types: &[TorrentType], at: DateTime<Utc>) {
        let record = self
            .records
            .entry(entry.href.clone())
            .or_insert_with(|| HistoryRecord::new(&entry.href, phase, &entry.video_code, at));
        for &kind in selected_types {
            record.mark(kind, at);
        }
        record.touch(at);
    }

    /// A superset of [`Self::merge`] used by the uploader after a successful
    /// add; defaults the phase to `Phase::One` on the rare path where the
    /// uploader sees an entry the scraper never recorded.
    pub fn mark_downloaded(&mut self, entry: &Entry, types: &[TorrentType], at: DateTime<Utc>) {
        let phase = self.lookup(&entry.href).map_or(Phase::One, |record| record.phase);
        self.merge(entry, phase, types, at);
    }

    /// Rewrite the table to disk, fsync, and release the write lock.
    ///
    /// # Errors
    /// Returns an error if the temporary file cannot be written, synced, or
    /// renamed into place.
    pub fn commit(mut self) -> IngestResult<()> {
        self.write_table()?;
        if let Some(lock) = self.lock.take() {
            lock.unlock().ok();
        }
        Ok(())
    }

    fn write_table(&self) -> IngestResult<()> {
        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let file = File::create(&tmp_path)
                .map_err(|source| IngestError::io(format!("creating {}", tmp_path.display()), source))?;
            let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(&file);
            let mut hrefs: Vec<&String> = self.records.keys().collect();
            hrefs.sort();
            for href in hrefs {
                let row = HistoryRow::from(&self.records[href]);
                writer
                    .serialize(&row)
                    .map_err(|source| IngestError::io("writing history row", std::io::Error::other(source)))?;
            }
            writer.flush().map_err(|source| IngestError::io("flushing history table", source))?;
            drop(writer);
            file.sync_all()
                .map_err(|source| IngestError::io("fsyncing history table", source))?;
        }
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|source| IngestError::io("renaming history table into place", source))?;
        Ok(())
    }
}

fn load_records(path: &Path) -> IngestResult<HashMap<String, HistoryRecord>> {
    if std::fs::metadata(path).map(|meta| meta.len() == 0).unwrap_or(true) {
        return Ok(HashMap::new());
    }

    let file = File::open(path).map_err(|source| IngestError::io(format!("opening history table {}", path.display()), source))?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(&file);
    let header = reader
        .headers()
        .map_err(|source| IngestError::io("reading history table header", std::io::Error::other(source)))?
        .clone();

    let mut records = HashMap::new();
    if header.iter().any(|field| field == CURRENT_SCHEMA_MARKER) {
        for row in reader.deserialize::<HistoryRow>() {
            let row = row.map_err(|source| IngestError::io("parsing history row", std::io::Error::other(source)))?;
            let record = row.into_record().map_err(|message| IngestError::LogicGuard { message })?;
            records.insert(record.href.clone(), record);
        }
    } else {
        tracing::info!("legacy history schema detected, migrating in place");
        for row in reader.deserialize::<LegacyHistoryRow>() {
            let row = row.map_err(|source| IngestError::io("parsing legacy history row", std::io::Error::other(source)))?;
            let record: HistoryRecord = row.into();
            records.insert(record.href.clone(), record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(href: &str, video_code: &str) -> Entry {
        let now = Utc::now();
        Entry {
            video_code: video_code.into(),
            href: href.into(),
            title: "Title".into(),
            page: 1,
            actor: None,
            rating: None,
            comment_count: None,
            tags: Default::default(),
            create_date: now,
            update_date: now,
        }
    }

    #[test]
    fn new_entry_phase_1_wants_hacked_subtitle_and_subtitle() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("history.csv")).unwrap();
        let set = store.should_process(&entry("h1", "ABC"), Phase::One, HistoryOverrides::default());
        assert_eq!(set, [TorrentType::HackedSubtitle, TorrentType::Subtitle].into_iter().collect());
    }

    #[test]
    fn new_entry_phase_2_wants_hacked_no_subtitle_only() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("history.csv")).unwrap();
        let set = store.should_process(&entry("h1", "ABC"), Phase::Two, HistoryOverrides::default());
        assert_eq!(set, [TorrentType::HackedNoSubtitle].into_iter().collect());
    }

    #[test]
    fn phase_2_upgrade_path_requires_no_subtitle_already_recorded() {
        let dir = tempdir().unwrap();
        let mut store = HistoryStore::open(dir.path().join("history.csv")).unwrap();
        let e = entry("h1", "ABC");

        assert!(store.should_process(&e, Phase::Two, HistoryOverrides::default()).is_empty());

        store.merge(&e, Phase::One, &[TorrentType::NoSubtitle], Utc::now());
        let set = store.should_process(&e, Phase::Two, HistoryOverrides::default());
        assert_eq!(set, [TorrentType::HackedNoSubtitle].into_iter().collect());
    }

    #[test]
    fn ignore_history_override_returns_all_four_types() {
        let dir = tempdir().unwrap();
        let mut store = HistoryStore::open(dir.path().join("history.csv")).unwrap();
        let e = entry("h1", "ABC");
        store.merge(&e, Phase::One, &TorrentType::ALL, Utc::now());

        let overrides = HistoryOverrides { ignore_history: true };
        let set = store.should_process(&e, Phase::One, overrides);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn merge_never_clears_an_existing_timestamp() {
        let dir = tempdir().unwrap();
        let mut store = HistoryStore::open(dir.path().join("history.csv")).unwrap();
        let e = entry("h1", "ABC");
        let first = Utc::now();
        store.merge(&e, Phase::One, &[TorrentType::Subtitle], first);
        store.merge(&e, Phase::One, &[TorrentType::Subtitle], first + chrono::Duration::seconds(100));

        assert_eq!(store.lookup("h1").unwrap().column(TorrentType::Subtitle), Some(first));
    }

    #[test]
    fn commit_then_reopen_round_trips_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let e = entry("h1", "ABC-123");
        let at = Utc::now();

        let mut store = HistoryStore::open(&path).unwrap();
        store.merge(&e, Phase::One, &[TorrentType::Subtitle], at);
        store.commit().unwrap();

        let reopened = HistoryStore::open(&path).unwrap();
        assert!(reopened.is_downloaded("h1", TorrentType::Subtitle));
        assert!(!reopened.is_downloaded("h1", TorrentType::HackedSubtitle));
    }

    #[test]
    fn legacy_schema_migrates_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(&path, "href,video_code,downloaded_at\nh1,ABC-123,2024-01-01T00:00:00Z\n").unwrap();

        let store = HistoryStore::open(&path).unwrap();
        let record = store.lookup("h1").unwrap();
        assert_eq!(record.phase, Phase::One);
        assert!(TorrentType::ALL.iter().all(|&t| !record.is_downloaded(t)));
    }
}
