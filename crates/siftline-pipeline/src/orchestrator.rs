//! Drives one pipeline invocation end-to-end (§4.8): scraper, then uploader,
//! then the deep-storage bridge, classifying the outcome as it goes and
//! producing exactly one [`RunStatus`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};
use siftline_core::{BanRecord, IngestError, RunCounts, RunOutcome, RunStatus};
use siftline_events::{EventBus, RunEvent};
use siftline_history::HistoryStore;
use siftline_proxy::ProxyPool;
use siftline_scraper::ScraperEngine;
use siftline_telemetry::LogExcerptCollector;
use siftline_uploader::{TorrentClient, UploaderEngine};

use crate::bridge::DeepStorageBridge;
use crate::summary::RunSummary;

/// A completed run's machine-classified status plus its notification body.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The run's final classification and counters.
    pub status: RunStatus,
    /// JSON-renderable summary for the out-of-scope notification transport.
    pub summary: RunSummary,
}

/// Everything one pipeline invocation needs. Constructed once per run by the
/// binary's bootstrap from a loaded [`siftline_config::Config`].
pub struct PipelineOrchestrator {
    scraper: ScraperEngine,
    uploader: UploaderEngine,
    torrent_client: Arc<dyn TorrentClient>,
    bridge: Arc<dyn DeepStorageBridge>,
    proxy_pool: Option<Arc<ProxyPool>>,
    log_excerpts: Option<Arc<LogExcerptCollector>>,
    events: Option<Arc<EventBus>>,
    history_path: PathBuf,
    /// Torrents older than this are offered to the deep-storage bridge.
    retention: ChronoDuration,
    bridge_categories: Vec<String>,
}

impl PipelineOrchestrator {
    /// Construct an orchestrator from its already-wired collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scraper: ScraperEngine,
        uploader: UploaderEngine,
        torrent_client: Arc<dyn TorrentClient>,
        bridge: Arc<dyn DeepStorageBridge>,
        proxy_pool: Option<Arc<ProxyPool>>,
        log_excerpts: Option<Arc<LogExcerptCollector>>,
        events: Option<Arc<EventBus>>,
        history_path: impl Into<PathBuf>,
        retention: ChronoDuration,
        bridge_categories: Vec<String>,
    ) -> Self {
        Self {
            scraper,
            uploader,
            torrent_client,
            bridge,
            proxy_pool,
            log_excerpts,
            events,
            history_path: history_path.into(),
            retention,
            bridge_categories,
        }
    }

    /// Run the whole pipeline against `report_path`. Always returns a
    /// [`PipelineOutcome`]: per §7, no failure is silent, even ones that
    /// abort the run before the uploader or bridge step ever runs.
    pub async fn run(&self, report_path: &Path) -> PipelineOutcome {
        let mut step_durations: Vec<(&'static str, Duration)> = Vec::new();

        let mut history = match HistoryStore::open(&self.history_path) {
            Ok(store) => store,
            Err(err) => {
                tracing::error!(%err, "failed to open history store");
                return self.finish(RunOutcome::FailedCritical, RunCounts::default(), step_durations);
            }
        };

        let scraper_started = Instant::now();
        let scrape = match self.scraper.run(&mut history, report_path).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(%err, "scraper aborted with a critical error");
                step_durations.push(("scraper", scraper_started.elapsed()));
                self.commit(history);
                return self.finish(RunOutcome::FailedCritical, RunCounts::default(), step_durations);
            }
        };
        step_durations.push(("scraper", scraper_started.elapsed()));

        let mut counts = scrape.counts;

        // Exit code 2 (proxy ban) and exit code 1 (critical, non-ban) both
        // abort the remaining steps: there is nothing a report-reading
        // uploader or a deep-storage sweep can usefully do against a run
        // that never produced trustworthy output.
        if !matches!(scrape.outcome, RunOutcome::Success) {
            self.commit(history);
            return self.finish(scrape.outcome, counts, step_durations);
        }

        // Step 3 (commit-and-push intermediate artifacts to an external
        // version-control collaborator) is out of scope; nothing to do here.

        let uploader_started = Instant::now();
        let upload_outcome = self.uploader.run(report_path, &mut history).await;
        step_durations.push(("uploader", uploader_started.elapsed()));
        let mut outcome = match upload_outcome {
            Ok(upload_counts) => {
                counts.adds_succeeded = upload_counts.adds_succeeded;
                counts.adds_rejected = upload_counts.adds_rejected;
                counts.adds_failed = upload_counts.adds_failed;
                if all_attempted_adds_failed(&counts) {
                    tracing::error!("every torrent add attempted this run failed");
                }
                upload_outcome_from_counts(&counts)
            }
            Err(err) => {
                tracing::error!(%err, "uploader aborted with a critical error");
                RunOutcome::FailedCritical
            }
        };

        if matches!(outcome, RunOutcome::Success) {
            let bridge_started = Instant::now();
            let bridge_result = self.run_bridge_step().await;
            step_durations.push(("deep_storage_bridge", bridge_started.elapsed()));
            if let Err(err) = bridge_result {
                if err.failure_kind() == Some(siftline_core::FailureKind::Network) {
                    tracing::error!(%err, "deep-storage bridge unreachable");
                    outcome = RunOutcome::FailedCritical;
                } else {
                    tracing::warn!(%err, "deep-storage bridge reported a non-critical failure");
                }
            }
        }

        let outcome = apply_success_empty(outcome, &counts);

        self.commit(history);
        self.finish(outcome, counts, step_durations)
    }

    /// Offer torrents older than the retention window to the deep-storage
    /// bridge (§4.8 step 5).
    async fn run_bridge_step(&self) -> Result<(), IngestError> {
        self.bridge.login().await?;

        let cutoff = Utc::now() - self.retention;
        let candidates: Vec<_> = self
            .torrent_client
            .list_recent(chrono::DateTime::<Utc>::MIN_UTC, &self.bridge_categories)
            .await?
            .into_iter()
            .filter(|handle| handle.added_at <= cutoff)
            .collect();

        if candidates.is_empty() {
            return Ok(());
        }

        let hashes: Vec<String> = candidates.iter().map(|handle| handle.hash.clone()).collect();
        let batch_id = self.bridge.submit_batch(&hashes).await?;
        let statuses = self.bridge.status(&batch_id).await?;
        let failed = statuses.iter().filter(|status| matches!(status, crate::bridge::BridgeItemStatus::Failed)).count();
        if failed > 0 {
            tracing::warn!(failed, total = statuses.len(), "deep-storage bridge rejected some items");
        }

        Ok(())
    }

    fn commit(&self, history: HistoryStore) {
        if let Err(err) = history.commit() {
            tracing::error!(%err, "failed to commit history store");
        }
    }

    fn finish(&self, outcome: RunOutcome, counts: RunCounts, step_durations: Vec<(&'static str, Duration)>) -> PipelineOutcome {
        self.publish(RunEvent::RunFinished { outcome });
        let ban_ledger_delta: Vec<BanRecord> = self.proxy_pool.as_ref().map(|pool| pool.take_ban_delta()).unwrap_or_default();
        let log_excerpts = self.log_excerpts.as_ref().map(|collector| collector.snapshot()).unwrap_or_default();
        let summary = RunSummary::new(outcome, counts, &ban_ledger_delta, &log_excerpts, &step_durations);
        let status = RunStatus { outcome, counts, log_excerpts, ban_ledger_delta };
        PipelineOutcome { status, summary }
    }

    fn publish(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

/// Whether every torrent add actually attempted this run failed (§4.8's
/// "all torrent adds failed when attempted (> 0 attempted)" rule). A run
/// where zero adds were attempted is not a failure by this rule.
fn all_attempted_adds_failed(counts: &RunCounts) -> bool {
    let attempted = counts.adds_succeeded + counts.adds_rejected + counts.adds_failed;
    attempted > 0 && counts.adds_succeeded == 0 && counts.adds_rejected == 0
}

/// Classify the uploader's counters per §4.8's error table: a wholesale add
/// failure is critical; anything else (including individual rejections) is
/// not.
fn upload_outcome_from_counts(counts: &RunCounts) -> RunOutcome {
    if all_attempted_adds_failed(counts) {
        RunOutcome::FailedCritical
    } else {
        RunOutcome::Success
    }
}

/// Downgrade a `Success` outcome to `SuccessEmpty` when the run selected no
/// entries and added no torrents (§3's `RunStatus` variants).
fn apply_success_empty(outcome: RunOutcome, counts: &RunCounts) -> RunOutcome {
    if matches!(outcome, RunOutcome::Success) && counts.entries_selected == 0 && counts.adds_succeeded == 0 {
        RunOutcome::SuccessEmpty
    } else {
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(adds_succeeded: u32, adds_rejected: u32, adds_failed: u32, entries_selected: u32) -> RunCounts {
        RunCounts { adds_succeeded, adds_rejected, adds_failed, entries_selected, ..RunCounts::default() }
    }

    #[test]
    fn zero_attempted_adds_is_not_a_failure() {
        assert!(!all_attempted_adds_failed(&counts(0, 0, 0, 0)));
        assert_eq!(upload_outcome_from_counts(&counts(0, 0, 0, 0)), RunOutcome::Success);
    }

    #[test]
    fn every_attempted_add_failing_is_critical() {
        assert!(all_attempted_adds_failed(&counts(0, 0, 3, 5)));
        assert_eq!(upload_outcome_from_counts(&counts(0, 0, 3, 5)), RunOutcome::FailedCritical);
    }

    #[test]
    fn a_single_success_among_failures_is_not_critical() {
        assert!(!all_attempted_adds_failed(&counts(1, 0, 3, 5)));
        assert_eq!(upload_outcome_from_counts(&counts(1, 0, 3, 5)), RunOutcome::Success);
    }

    #[test]
    fn rejections_alone_are_not_critical() {
        assert!(!all_attempted_adds_failed(&counts(0, 4, 0, 4)));
        assert_eq!(upload_outcome_from_counts(&counts(0, 4, 0, 4)), RunOutcome::Success);
    }

    #[test]
    fn success_with_no_new_work_downgrades_to_success_empty() {
        let outcome = apply_success_empty(RunOutcome::Success, &counts(0, 0, 0, 0));
        assert_eq!(outcome, RunOutcome::SuccessEmpty);
    }

    #[test]
    fn success_with_new_adds_stays_success() {
        let outcome = apply_success_empty(RunOutcome::Success, &counts(2, 0, 0, 2));
        assert_eq!(outcome, RunOutcome::Success);
    }

    #[test]
    fn non_success_outcomes_are_never_downgraded() {
        let outcome = apply_success_empty(RunOutcome::FailedCritical, &counts(0, 0, 0, 0));
        assert_eq!(outcome, RunOutcome::FailedCritical);
    }
}
