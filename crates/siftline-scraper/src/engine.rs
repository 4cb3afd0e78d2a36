//! The two-phase crawl state machine (§4.6):
//!
//! ```text
//! START → FETCH_INDEX → PARSE_INDEX → FILTER → (per entry) DECIDE →
//!     FETCH_DETAIL → CLASSIFY → RECORD → NEXT_PAGE → END
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use siftline_classify::classify;
use siftline_config::{ProxyModule, ScraperConfig};
use siftline_core::{
    DOWNLOADED_MARKER, Entry, IngestError, IngestResult, Phase, ReportRow, RunCounts, RunOutcome,
    TorrentType,
};
use siftline_events::{EventBus, RunEvent};
use siftline_history::{HistoryOverrides, HistoryStore};
use siftline_http::{Classification, HttpClient, RequestSpec};
use siftline_parser::{parse_detail_page, parse_index_page, phase_1_admits, phase_2_admits, DetailExtras, FilterOverrides};
use tokio::sync::Semaphore;

use crate::budget::WallClockBudget;
use crate::report::ReportWriter;

/// The scraper's output: accumulated counters and the exit-code-bearing
/// outcome classification C6 owns (§4.6's own `0`/`1`/`2` contract).
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    /// Per-step counters accumulated across every phase run.
    pub counts: RunCounts,
    /// `Success`, `FailedCritical`, or `FailedProxyBanned` — never
    /// `SuccessEmpty`, which is a whole-pipeline judgment C8 makes.
    pub outcome: RunOutcome,
}

/// Drives one scraper invocation: index pagination, per-entry admission,
/// detail fetching, classification, and report emission.
pub struct ScraperEngine {
    http: Arc<HttpClient>,
    config: ScraperConfig,
    options: crate::options::RunOptions,
    events: Option<Arc<EventBus>>,
}

enum PlannedEntry {
    /// Already fully satisfied by history; no detail fetch needed.
    Prefilled(Entry),
    /// Needs a detail fetch to obtain magnets for `needed`.
    NeedsDetail(Entry, BTreeSet<TorrentType>),
}

enum DetailOutcome {
    Fetched(Vec<siftline_core::Magnet>, DetailExtras),
    Failed(String),
}

impl ScraperEngine {
    /// Construct an engine. `events`, when present, receives `RunEvent`s as
    /// the crawl progresses.
    #[must_use]
    pub fn new(
        http: Arc<HttpClient>,
        config: ScraperConfig,
        options: crate::options::RunOptions,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        Self { http, config, options, events }
    }

    /// Run every configured phase in sequence, writing to (or, in dry-run
    /// mode, skipping) a report at `report_path`.
    ///
    /// # Errors
    /// Returns [`IngestError::Auth`] or [`IngestError::Io`] immediately:
    /// both always bubble to the orchestrator as a critical failure (§7).
    pub async fn run(&self, history: &mut HistoryStore, report_path: &std::path::Path) -> IngestResult<ScrapeOutcome> {
        let mut report = if self.options.dry_run {
            None
        } else {
            Some(ReportWriter::create(report_path)?)
        };
        let mut counts = RunCounts::default();
        let budget = WallClockBudget::new(self.options.wall_clock_budget);

        let mut proxy_exhausted = false;
        for phase in self.options.phase.phases() {
            if self.run_phase(phase, history, report.as_mut(), &budget, &mut counts).await? {
                proxy_exhausted = true;
                break;
            }
        }

        if let Some(writer) = report {
            writer.finish()?;
        }

        let outcome = if proxy_exhausted {
            RunOutcome::FailedProxyBanned
        } else if counts.pages_attempted > 0 && counts.pages_failed == counts.pages_attempted {
            RunOutcome::FailedCritical
        } else {
            RunOutcome::Success
        };

        Ok(ScrapeOutcome { counts, outcome })
    }

    /// Run one phase to completion. Returns `true` when the proxy pool was
    /// exhausted and the whole run must abort.
    async fn run_phase(
        &self,
        phase: Phase,
        history: &mut HistoryStore,
        mut report: Option<&mut ReportWriter>,
        budget: &WallClockBudget,
        counts: &mut RunCounts,
    ) -> IngestResult<bool> {
        let mut page = self.options.start_page;
        loop {
            if budget.expired() {
                tracing::info!(?phase, page, "wall-clock budget exceeded, stopping at page boundary");
                break;
            }
            if !self.options.all_mode && page > self.options.end_page {
                break;
            }

            counts.pages_attempted += 1;
            let request = RequestSpec::get(index_url(&self.options.base_url, page), ProxyModule::SpiderIndex)
                .with_min_interval(Duration::from_millis(self.config.page_sleep_ms));

            let outcome = match self.http.execute(request).await {
                Ok(outcome) => outcome,
                Err(IngestError::NoProxyAvailable) => {
                    counts.ban_events += 1;
                    tracing::warn!(?phase, page, "proxy pool exhausted, aborting run");
                    return Ok(true);
                }
                Err(err @ (IngestError::Auth { .. } | IngestError::Io { .. })) => return Err(err),
                Err(err) => {
                    tracing::warn!(?phase, page, %err, "index page fetch failed");
                    counts.pages_failed += 1;
                    self.publish(RunEvent::PageFetched { page, ok: false });
                    page += 1;
                    continue;
                }
            };

            match outcome.classification {
                Classification::Ok => {}
                Classification::Auth => {
                    return Err(IngestError::Auth {
                        message: format!("index page {page} returned an auth failure"),
                    });
                }
                Classification::Ban => {
                    counts.ban_events += 1;
                    counts.pages_failed += 1;
                    self.publish(RunEvent::PageFetched { page, ok: false });
                    page += 1;
                    continue;
                }
                Classification::Transient | Classification::Network => {
                    counts.pages_failed += 1;
                    self.publish(RunEvent::PageFetched { page, ok: false });
                    page += 1;
                    continue;
                }
            }

            self.publish(RunEvent::PageFetched { page, ok: true });
            let body = String::from_utf8_lossy(&outcome.body).into_owned();
            let entries = parse_index_page(&body, page);
            if entries.is_empty() && self.options.all_mode {
                break;
            }

            let aborted = self
                .process_page_entries(phase, entries, history, report.as_deref_mut(), counts)
                .await?;
            if aborted {
                return Ok(true);
            }

            page += 1;
        }
        Ok(false)
    }

    /// FILTER, DECIDE, FETCH_DETAIL, CLASSIFY, and RECORD for one page's
    /// entries. Returns `true` when the proxy pool was exhausted mid-page.
    async fn process_page_entries(
        &self,
        phase: Phase,
        entries: Vec<Entry>,
        history: &mut HistoryStore,
        mut report: Option<&mut ReportWriter>,
        counts: &mut RunCounts,
    ) -> IngestResult<bool> {
        let overrides = FilterOverrides { skip_release_date_gate: self.options.ignore_release_date };
        let history_overrides = HistoryOverrides { ignore_history: self.options.ignore_history };

        let mut planned = Vec::with_capacity(entries.len());
        for entry in entries {
            let admits = match phase {
                Phase::One => phase_1_admits(&entry, overrides),
                Phase::Two => phase_2_admits(&entry, &self.config),
            };
            if !admits {
                continue;
            }
            counts.entries_selected += 1;

            let needed = history.should_process(&entry, phase, history_overrides);
            if needed.is_empty() {
                planned.push(PlannedEntry::Prefilled(entry));
            } else {
                self.publish(RunEvent::EntrySelected {
                    video_code: entry.video_code.clone(),
                    needed: needed.iter().copied().collect(),
                });
                planned.push(PlannedEntry::NeedsDetail(entry, needed));
            }

            if self.config.entry_sleep_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.entry_sleep_ms)).await;
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.options.detail_concurrency.max(1)));
        let mut handles = Vec::with_capacity(planned.len());
        for item in &planned {
            match item {
                PlannedEntry::Prefilled(_) => handles.push(None),
                PlannedEntry::NeedsDetail(entry, _) => {
                    let permit = semaphore.clone().acquire_owned().await.expect("semaphore is never closed");
                    let http = self.http.clone();
                    let base_url = self.options.base_url.clone();
                    let detail_sleep_ms = self.config.detail_sleep_ms;
                    let href = entry.href.clone();
                    handles.push(Some(tokio::spawn(async move {
                        let _permit = permit;
                        fetch_detail(&http, &base_url, detail_sleep_ms, &href).await
                    })));
                }
            }
        }

        for (item, handle) in planned.into_iter().zip(handles) {
            match item {
                PlannedEntry::Prefilled(entry) => {
                    if let Some(writer) = report.as_deref_mut() {
                        writer.write_row(&prefilled_row(&entry, history))?;
                    }
                }
                PlannedEntry::NeedsDetail(mut entry, needed) => {
                    let handle = handle.expect("a detail task was spawned for every NeedsDetail entry");
                    let detail = match handle.await {
                        Ok(Ok(detail)) => detail,
                        Ok(Err(IngestError::NoProxyAvailable)) => {
                            counts.ban_events += 1;
                            return Ok(true);
                        }
                        Ok(Err(err @ (IngestError::Auth { .. } | IngestError::Io { .. }))) => return Err(err),
                        Ok(Err(err)) => DetailOutcome::Failed(err.to_string()),
                        Err(join_err) => DetailOutcome::Failed(join_err.to_string()),
                    };

                    match detail {
                        DetailOutcome::Fetched(magnets, extras) => {
                            apply_extras(&mut entry, extras);
                            counts.entries_detailed += 1;
                            let buckets = classify(magnets);
                            let row = detailed_row(&entry, &buckets, &needed);
                            if !self.options.dry_run {
                                history.merge(&entry, phase, &needed.iter().copied().collect::<Vec<_>>(), chrono::Utc::now());
                            }
                            if let Some(writer) = report.as_deref_mut() {
                                writer.write_row(&row)?;
                            }
                        }
                        DetailOutcome::Failed(message) => {
                            counts.entries_failed += 1;
                            self.publish(RunEvent::DetailFailed { video_code: entry.video_code.clone(), message });
                        }
                    }
                }
            }
        }

        Ok(false)
    }

    fn publish(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

async fn fetch_detail(
    http: &HttpClient,
    base_url: &str,
    detail_sleep_ms: u64,
    href: &str,
) -> IngestResult<DetailOutcome> {
    let request = RequestSpec::get(detail_url(base_url, href), ProxyModule::SpiderDetail)
        .with_min_interval(Duration::from_millis(detail_sleep_ms));

    let outcome = match http.execute(request).await {
        Ok(outcome) => outcome,
        Err(err @ (IngestError::NoProxyAvailable | IngestError::Auth { .. } | IngestError::Io { .. })) => {
            return Err(err);
        }
        Err(err) => return Ok(DetailOutcome::Failed(err.to_string())),
    };

    match outcome.classification {
        Classification::Ok => {
            let body = String::from_utf8_lossy(&outcome.body).into_owned();
            let (magnets, extras) = parse_detail_page(&body);
            Ok(DetailOutcome::Fetched(magnets, extras))
        }
        Classification::Auth => Err(IngestError::Auth {
            message: format!("detail page {href} returned an auth failure"),
        }),
        Classification::Ban | Classification::Transient | Classification::Network => {
            Ok(DetailOutcome::Failed(format!("{:?}", outcome.classification)))
        }
    }
}

fn apply_extras(entry: &mut Entry, extras: DetailExtras) {
    if entry.actor.is_none() {
        entry.actor = extras.actor;
    }
    if entry.rating.is_none() {
        entry.rating = extras.rating;
    }
    if entry.comment_count.is_none() {
        entry.comment_count = extras.comment_count;
    }
}

/// Build the row for an entry whose admission set was already fully
/// satisfied by history: no detail fetch happened, so only pre-known marks
/// (the downloaded marker, no magnet) are recorded.
fn prefilled_row(entry: &Entry, history: &HistoryStore) -> ReportRow {
    let mut magnets: [String; 4] = Default::default();
    let sizes: [String; 4] = Default::default();
    for (idx, kind) in TorrentType::ALL.into_iter().enumerate() {
        if history.is_downloaded(&entry.href, kind) {
            magnets[idx] = DOWNLOADED_MARKER.to_string();
        }
    }
    ReportRow {
        href: entry.href.clone(),
        video_code: entry.video_code.clone(),
        title: entry.title.clone(),
        page: entry.page,
        actor: entry.actor.clone(),
        rating: entry.rating,
        comment_count: entry.comment_count,
        magnets,
        sizes,
    }
}

/// Build the row for an entry whose detail page was fetched: magnets from
/// the buckets history requested, and only those (§4.6).
fn detailed_row(
    entry: &Entry,
    buckets: &std::collections::BTreeMap<TorrentType, siftline_core::Magnet>,
    needed: &BTreeSet<TorrentType>,
) -> ReportRow {
    let mut magnets: [String; 4] = Default::default();
    let mut sizes: [String; 4] = Default::default();
    for (idx, kind) in TorrentType::ALL.into_iter().enumerate() {
        if !needed.contains(&kind) {
            continue;
        }
        if let Some(magnet) = buckets.get(&kind) {
            magnets[idx] = magnet.uri.clone();
            sizes[idx] = magnet.size_text.clone();
        }
    }
    ReportRow {
        href: entry.href.clone(),
        video_code: entry.video_code.clone(),
        title: entry.title.clone(),
        page: entry.page,
        actor: entry.actor.clone(),
        rating: entry.rating,
        comment_count: entry.comment_count,
        magnets,
        sizes,
    }
}

fn index_url(base_url: &str, page: u32) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}page={page}")
}

fn detail_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let root = base_url.split_once("://").map_or(base_url, |(_, rest)| rest);
    let origin = root.split_once('/').map_or(root, |(host, _)| host);
    let scheme = if base_url.starts_with("https://") { "https" } else { "http" };
    format!("{scheme}://{origin}{}", if href.starts_with('/') { href.to_string() } else { format!("/{href}") })
}
