//! The uploader algorithm (§4.7): walk a report's magnet cells, skip
//! already-downloaded ones, add the rest to the torrent client, and
//! annotate the report as it goes.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use siftline_config::TorrentClientConfig;
use siftline_core::{Entry, IngestError, IngestResult, ReportRow, RunCounts, RunMode, TorrentType};
use siftline_events::{EventBus, RunEvent};
use siftline_history::HistoryStore;

use crate::client::{AddOutcome, TorrentClient};
use crate::report_io::{read_rows, write_rows_atomic};

/// Drives one uploader invocation against a single report file.
pub struct UploaderEngine {
    client: Arc<dyn TorrentClient>,
    config: TorrentClientConfig,
    mode: RunMode,
    dry_run: bool,
    events: Option<Arc<EventBus>>,
}

impl UploaderEngine {
    /// Construct an engine. `events`, when present, receives `RunEvent`s as
    /// torrents are added.
    #[must_use]
    pub fn new(
        client: Arc<dyn TorrentClient>,
        config: TorrentClientConfig,
        mode: RunMode,
        dry_run: bool,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        Self { client, config, mode, dry_run, events }
    }

    /// Process every row of the report at `path`, updating `history` and
    /// rewriting the report in place.
    ///
    /// # Errors
    /// Returns [`IngestError::Auth`] immediately if the client rejects
    /// credentials or its session expires mid-run: both are critical (§4.7)
    /// and leave the report untouched for manual retry.
    pub async fn run(&self, path: &Path, history: &mut HistoryStore) -> IngestResult<RunCounts> {
        let mut rows = read_rows(path)?;
        let mut counts = RunCounts::default();
        let mut logged_in = false;
        let category = match self.mode {
            RunMode::Daily => self.config.category_daily.as_str(),
            RunMode::AdHoc => self.config.category_adhoc.as_str(),
        };

        for row in &mut rows {
            for kind in TorrentType::ALL {
                if row.is_absent(kind) || row.is_marked_downloaded(kind) {
                    continue;
                }

                if history.is_downloaded(&row.href, kind) {
                    row.mark_downloaded(kind);
                    continue;
                }

                if self.dry_run {
                    continue;
                }

                if !logged_in {
                    self.client.login().await?;
                    logged_in = true;
                }

                let video_code = row.video_code.clone();
                let outcome = self
                    .client
                    .add(row.magnet_uri(kind), category, &self.config.save_path, self.config.auto_start, self.config.skip_checking)
                    .await;

                match outcome {
                    Ok(AddOutcome::Added) => {
                        counts.adds_succeeded += 1;
                        history.mark_downloaded(&entry_from_row(row), &[kind], Utc::now());
                        row.mark_downloaded(kind);
                        self.publish(RunEvent::UploadResult { video_code, kind, ok: true });
                    }
                    Ok(AddOutcome::Rejected) => {
                        counts.adds_rejected += 1;
                        self.publish(RunEvent::UploadResult { video_code, kind, ok: false });
                    }
                    Err(err @ IngestError::Auth { .. }) => return Err(err),
                    Err(err) => {
                        tracing::warn!(%video_code, ?kind, %err, "torrent add failed");
                        counts.adds_failed += 1;
                        self.publish(RunEvent::UploadResult { video_code, kind, ok: false });
                    }
                }

                if self.config.inter_add_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.inter_add_delay_ms)).await;
                }
            }
        }

        if !self.dry_run {
            write_rows_atomic(path, &rows)?;
        }

        Ok(counts)
    }

    fn publish(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

/// Build a minimal `Entry` from a `ReportRow` for `HistoryStore::mark_downloaded`,
/// which only reads `href`/`video_code` (and looks up the phase itself).
fn entry_from_row(row: &ReportRow) -> Entry {
    let now = Utc::now();
    Entry {
        video_code: row.video_code.clone(),
        href: row.href.clone(),
        title: row.title.clone(),
        page: row.page,
        actor: row.actor.clone(),
        rating: row.rating,
        comment_count: row.comment_count,
        tags: BTreeSet::new(),
        create_date: now,
        update_date: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use siftline_core::TorrentType;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    use crate::client::TorrentHandle;

    #[derive(Default)]
    struct FakeClient {
        logins: AtomicU32,
        adds: AtomicU32,
        reject_next: std::sync::atomic::AtomicBool,
        fail_auth: bool,
    }

    #[async_trait]
    impl TorrentClient for FakeClient {
        async fn login(&self) -> IngestResult<()> {
            if self.fail_auth {
                return Err(IngestError::Auth { message: "bad credentials".into() });
            }
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn add(&self, _magnet: &str, _category: &str, _save_path: &str, _auto_start: bool, _skip_checking: bool) -> IngestResult<AddOutcome> {
            self.adds.fetch_add(1, Ordering::SeqCst);
            if self.reject_next.swap(false, Ordering::SeqCst) {
                Ok(AddOutcome::Rejected)
            } else {
                Ok(AddOutcome::Added)
            }
        }

        async fn list_recent(&self, _since: chrono::DateTime<Utc>, _categories: &[String]) -> IngestResult<Vec<TorrentHandle>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _hash: &str, _delete_files: bool) -> IngestResult<()> {
            Ok(())
        }
    }

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

    fn config() -> TorrentClientConfig {
        TorrentClientConfig {
            host: "localhost".into(),
            port: 8080,
            user: "admin".into(),
            pass: "pass".into(),
            category_daily: "daily".into(),
            category_adhoc: "adhoc".into(),
            save_path: "/downloads".into(),
            auto_start: true,
            skip_checking: false,
            request_timeout_ms: 5_000,
            inter_add_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn adds_new_magnet_and_marks_report_and_history() {
        let dir = tempdir().unwrap();
        let report_path = dir.path().join("report.csv");
        write_rows_atomic(&report_path, &[row("/detail/1")]).unwrap();

        let history_path = dir.path().join("history.csv");
        let mut history = HistoryStore::open(&history_path).unwrap();

        let client = Arc::new(FakeClient::default());
        let engine = UploaderEngine::new(client.clone(), config(), RunMode::Daily, false, None);
        let counts = engine.run(&report_path, &mut history).await.unwrap();

        assert_eq!(counts.adds_succeeded, 1);
        assert_eq!(client.logins.load(Ordering::SeqCst), 1);
        assert!(history.is_downloaded("/detail/1", TorrentType::HackedSubtitle));

        let rows = read_rows(&report_path).unwrap();
        assert!(rows[0].is_marked_downloaded(TorrentType::HackedSubtitle));
    }

    #[tokio::test]
    async fn already_downloaded_history_entry_is_annotated_without_calling_add() {
        let dir = tempdir().unwrap();
        let report_path = dir.path().join("report.csv");
        write_rows_atomic(&report_path, &[row("/detail/1")]).unwrap();

        let history_path = dir.path().join("history.csv");
        let mut history = HistoryStore::open(&history_path).unwrap();
        history.merge(&entry_from_row(&row("/detail/1")), siftline_core::Phase::One, &[TorrentType::HackedSubtitle], Utc::now());

        let client = Arc::new(FakeClient::default());
        let engine = UploaderEngine::new(client.clone(), config(), RunMode::Daily, false, None);
        let counts = engine.run(&report_path, &mut history).await.unwrap();

        assert_eq!(counts.adds_succeeded, 0);
        assert_eq!(client.adds.load(Ordering::SeqCst), 0);
        let rows = read_rows(&report_path).unwrap();
        assert!(rows[0].is_marked_downloaded(TorrentType::HackedSubtitle));
    }

    #[tokio::test]
    async fn auth_failure_aborts_before_any_add_and_leaves_report_untouched() {
        let dir = tempdir().unwrap();
        let report_path = dir.path().join("report.csv");
        write_rows_atomic(&report_path, &[row("/detail/1")]).unwrap();

        let history_path = dir.path().join("history.csv");
        let mut history = HistoryStore::open(&history_path).unwrap();

        let client = Arc::new(FakeClient { fail_auth: true, ..FakeClient::default() });
        let engine = UploaderEngine::new(client, config(), RunMode::Daily, false, None);
        let err = engine.run(&report_path, &mut history).await.unwrap_err();

        assert!(matches!(err, IngestError::Auth { .. }));
        let rows = read_rows(&report_path).unwrap();
        assert!(!rows[0].is_marked_downloaded(TorrentType::HackedSubtitle));
    }

    #[tokio::test]
    async fn dry_run_adds_nothing_and_leaves_report_untouched() {
        let dir = tempdir().unwrap();
        let report_path = dir.path().join("report.csv");
        write_rows_atomic(&report_path, &[row("/detail/1")]).unwrap();

        let history_path = dir.path().join("history.csv");
        let mut history = HistoryStore::open(&history_path).unwrap();

        let client = Arc::new(FakeClient::default());
        let engine = UploaderEngine::new(client.clone(), config(), RunMode::Daily, true, None);
        let counts = engine.run(&report_path, &mut history).await.unwrap();

        assert_eq!(counts.adds_succeeded, 0);
        assert_eq!(client.logins.load(Ordering::SeqCst), 0);
        let rows = read_rows(&report_path).unwrap();
        assert!(!rows[0].is_marked_downloaded(TorrentType::HackedSubtitle));
    }
}
