//! Domain records shared by every stage of the ingestion pipeline.
//!
//! # Design
//! - Closed record types replace the duck-typed parse results of the source
//!   system: every field a downstream stage relies on is named here once.
//! - Timestamps are `chrono::DateTime<Utc>`; on-disk string forms are the
//!   concern of the crate that owns the file (history/report/ledger).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix recognized by the uploader as "magnet scheme".
pub const MAGNET_SCHEME_PREFIX: &str = "magnet:?";

/// Literal marker (note the trailing space) placed on a report magnet cell
/// once the uploader has consumed it.
pub const DOWNLOADED_MARKER: &str = "[DOWNLOADED] ";

/// The four torrent buckets a magnet can be classified into.
///
/// Closed enumeration: adding a fifth bucket is a breaking schema change
/// across history, report, and classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentType {
    /// Crack variant with embedded subtitles.
    HackedSubtitle,
    /// Crack variant without subtitles.
    HackedNoSubtitle,
    /// Standard variant with subtitles.
    Subtitle,
    /// Standard variant, possibly upgraded to 4K when available.
    NoSubtitle,
}

impl TorrentType {
    /// All four buckets in a stable, canonical column order.
    pub const ALL: [Self; 4] = [
        Self::HackedSubtitle,
        Self::HackedNoSubtitle,
        Self::Subtitle,
        Self::NoSubtitle,
    ];

    /// Canonical column/field name used on disk (history and report headers).
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::HackedSubtitle => "hacked_subtitle",
            Self::HackedNoSubtitle => "hacked_no_subtitle",
            Self::Subtitle => "subtitle",
            Self::NoSubtitle => "no_subtitle",
        }
    }

    /// Parse a column/field name back into a bucket.
    #[must_use]
    pub fn from_column_name(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.column_name() == value)
    }
}

impl std::fmt::Display for TorrentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Which catalog traversal produced a run: the default daily sweep over the
/// base catalog URL, or an ad-hoc one-off crawl from an operator-supplied
/// starting URL (§4.6, §6). Also selects the uploader's category mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Scheduled sweep of the base catalog URL.
    Daily,
    /// One-off crawl from a custom starting URL (e.g. an actor page).
    AdHoc,
}

impl RunMode {
    /// Folder name under the persisted report tree (§6).
    #[must_use]
    pub const fn report_subdir(self) -> &'static str {
        match self {
            Self::Daily => "DailyReport",
            Self::AdHoc => "AdHoc",
        }
    }

    /// Lower-case label matching the CLI's `mode` argument and the
    /// uploader's category-selection switch.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::AdHoc => "adhoc",
        }
    }
}

/// The scraper pass an entry or history record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Subtitle-centric admission pass.
    One,
    /// Quality-threshold-centric admission pass.
    Two,
}

impl Phase {
    /// Numeric form used on disk (`1` or `2`).
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Parse the numeric on-disk form.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}

/// A catalog item discovered on an index or detail page.
///
/// Invariant: `video_code` uniquely identifies an entry; `create_date <=
/// update_date` (enforced by [`Entry::touch`] and by history merge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Stable catalog identifier.
    pub video_code: String,
    /// Page-relative link to the entry's detail page.
    pub href: String,
    /// Human title.
    pub title: String,
    /// Page number on which the entry was discovered.
    pub page: u32,
    /// Optional actor/performer name.
    pub actor: Option<String>,
    /// Rating in `0.0..=5.0`, one decimal place of precision.
    pub rating: Option<f32>,
    /// Comment count, when present on the page.
    pub comment_count: Option<u32>,
    /// Normalized (lowercase) site tags, multilingual variants folded.
    pub tags: BTreeSet<String>,
    /// Timestamp the entry was first seen.
    pub create_date: DateTime<Utc>,
    /// Timestamp the entry was last modified.
    pub update_date: DateTime<Utc>,
}

impl Entry {
    /// Bump `update_date` to `at`, never moving it earlier than `create_date`.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.update_date {
            self.update_date = at;
        }
    }

    /// Whether the entry carries the given normalized tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// A magnet descriptor parsed from a detail page.
///
/// Invariant: `uri` begins with [`MAGNET_SCHEME_PREFIX`]; `tags` are
/// normalized lowercase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Magnet {
    /// The magnet URI itself.
    pub uri: String,
    /// Display name as shown on the detail page.
    pub name: String,
    /// Normalized (lowercase) descriptive tags, e.g. "subtitle", "4k".
    pub tags: BTreeSet<String>,
    /// Byte-size estimate parsed from the page's size text, when parseable.
    pub size_bytes: Option<u64>,
    /// Raw size text as displayed (kept for the report's size column).
    pub size_text: String,
    /// Raw timestamp text as displayed.
    pub timestamp_text: String,
}

impl Magnet {
    /// Construct a magnet, validating the URI scheme.
    ///
    /// # Errors
    /// Returns `Err` with the offending URI when it does not begin with the
    /// magnet scheme prefix.
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
        size_bytes: Option<u64>,
        size_text: impl Into<String>,
        timestamp_text: impl Into<String>,
    ) -> Result<Self, String> {
        let uri = uri.into();
        if !uri.starts_with(MAGNET_SCHEME_PREFIX) {
            return Err(uri);
        }
        Ok(Self {
            uri,
            name: name.into(),
            tags: tags.into_iter().map(|t| t.to_lowercase()).collect(),
            size_bytes,
            size_text: size_text.into(),
            timestamp_text: timestamp_text.into(),
        })
    }

    /// Whether the magnet carries the given normalized tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// One history row per entry: `href`, discovery phase, and per-type download
/// timestamps.
///
/// Invariant: writing a new type sets that column non-null and updates
/// `update_date`; an existing non-null column is never cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Key: page-relative link to the entry's detail page.
    pub href: String,
    /// Phase during which the entry was first recorded.
    pub phase: Phase,
    /// Stable catalog identifier.
    pub video_code: String,
    /// Timestamp the entry was first seen.
    pub create_date: DateTime<Utc>,
    /// Timestamp the record was last modified.
    pub update_date: DateTime<Utc>,
    /// Per-type first-download timestamp; `None` until that type is obtained.
    pub downloaded: [Option<DateTime<Utc>>; 4],
}

impl HistoryRecord {
    /// Create a fresh record with no type columns populated.
    #[must_use]
    pub fn new(href: impl Into<String>, phase: Phase, video_code: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            href: href.into(),
            phase,
            video_code: video_code.into(),
            create_date: at,
            update_date: at,
            downloaded: [None; 4],
        }
    }

    fn index_of(kind: TorrentType) -> usize {
        TorrentType::ALL
            .iter()
            .position(|t| *t == kind)
            .expect("TorrentType::ALL covers every variant")
    }

    /// Read the per-type download timestamp.
    #[must_use]
    pub fn column(&self, kind: TorrentType) -> Option<DateTime<Utc>> {
        self.downloaded[Self::index_of(kind)]
    }

    /// Whether `kind` has already been downloaded for this entry.
    #[must_use]
    pub fn is_downloaded(&self, kind: TorrentType) -> bool {
        self.column(kind).is_some()
    }

    /// Set `kind`'s timestamp if it is not already set, bumping
    /// `update_date`. Returns whether the column was newly written.
    pub fn mark(&mut self, kind: TorrentType, at: DateTime<Utc>) -> bool {
        let idx = Self::index_of(kind);
        if self.downloaded[idx].is_some() {
            return false;
        }
        self.downloaded[idx] = Some(at);
        if at > self.update_date {
            self.update_date = at;
        }
        true
    }
}

/// One row of a run-scoped report, one per selected entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Page-relative link to the entry's detail page.
    pub href: String,
    /// Stable catalog identifier.
    pub video_code: String,
    /// Human title.
    pub title: String,
    /// Page number on which the entry was discovered.
    pub page: u32,
    /// Optional actor/performer name.
    pub actor: Option<String>,
    /// Rating, when known.
    pub rating: Option<f32>,
    /// Comment count, when known.
    pub comment_count: Option<u32>,
    /// Per-type magnet URI cell (may carry the `[DOWNLOADED] ` prefix).
    pub magnets: [String; 4],
    /// Per-type size-text cell, paired positionally with `magnets`.
    pub sizes: [String; 4],
}

impl ReportRow {
    /// Whether the given bucket's cell is empty (no magnet was selected).
    #[must_use]
    pub fn is_absent(&self, kind: TorrentType) -> bool {
        self.magnets[Self::index_of(kind)].is_empty()
    }

    fn index_of(kind: TorrentType) -> usize {
        TorrentType::ALL
            .iter()
            .position(|t| *t == kind)
            .expect("TorrentType::ALL covers every variant")
    }

    /// Read the magnet cell for a bucket.
    #[must_use]
    pub fn magnet_cell(&self, kind: TorrentType) -> &str {
        &self.magnets[Self::index_of(kind)]
    }

    /// Whether the magnet cell for a bucket already carries the downloaded
    /// marker.
    #[must_use]
    pub fn is_marked_downloaded(&self, kind: TorrentType) -> bool {
        self.magnet_cell(kind).starts_with(DOWNLOADED_MARKER)
    }

    /// Prefix the magnet cell for a bucket with the downloaded marker,
    /// idempotently.
    pub fn mark_downloaded(&mut self, kind: TorrentType) {
        let idx = Self::index_of(kind);
        if !self.magnets[idx].starts_with(DOWNLOADED_MARKER) && !self.magnets[idx].is_empty() {
            self.magnets[idx] = format!("{DOWNLOADED_MARKER}{}", self.magnets[idx]);
        }
    }

    /// The bare magnet URI for a bucket, with any downloaded marker stripped.
    #[must_use]
    pub fn magnet_uri(&self, kind: TorrentType) -> &str {
        self.magnet_cell(kind)
            .strip_prefix(DOWNLOADED_MARKER)
            .unwrap_or_else(|| self.magnet_cell(kind))
    }
}

/// A reason code explaining why a proxy was banned or a failure reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connect/DNS/reset/timeout: retried, not a ban signal.
    Network,
    /// 5xx/429: retried, not a ban signal.
    TransientHttp,
    /// Sustained 403 / unsolvable challenge / forced age-gate loop.
    Ban,
    /// Expired session cookie or bad credentials.
    Auth,
}

impl FailureKind {
    /// Whether this failure kind is itself a ban signal for the proxy pool.
    #[must_use]
    pub const fn is_ban(self) -> bool {
        matches!(self, Self::Ban)
    }
}

/// A persistent record of a proxy ban, appended to the ban ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanRecord {
    /// Display name of the banned proxy.
    pub proxy_name: String,
    /// Outbound host of the banned proxy.
    pub proxy_host: String,
    /// When the ban was recorded.
    pub banned_at: DateTime<Utc>,
    /// When the cooldown expires and the proxy becomes eligible again.
    pub expires_at: DateTime<Utc>,
    /// Machine-readable reason code.
    pub reason: FailureKind,
    /// Human description (free text, e.g. "3 consecutive 403s").
    pub description: String,
}

impl BanRecord {
    /// Whether the ban is still active as of `now` (exclusive boundary: a
    /// record whose `expires_at` equals `now` is NOT banned).
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Final outcome classification for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Completed with at least one new torrent handed off.
    Success,
    /// Completed; no new work was found.
    SuccessEmpty,
    /// A critical, non-ban failure aborted the run.
    FailedCritical,
    /// The proxy pool was exhausted by bans.
    FailedProxyBanned,
}

impl RunOutcome {
    /// The process exit code this outcome maps to (§8 IP8).
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success | Self::SuccessEmpty => 0,
            Self::FailedCritical => 1,
            Self::FailedProxyBanned => 2,
        }
    }
}

/// Per-run counters accumulated by the scraper, uploader, and orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    /// Index pages the scraper attempted to fetch.
    pub pages_attempted: u32,
    /// Index pages that failed to fetch after retries.
    pub pages_failed: u32,
    /// Entries selected by `should_process` for detail fetching or carry-over.
    pub entries_selected: u32,
    /// Entries whose detail page was successfully fetched and classified.
    pub entries_detailed: u32,
    /// Entries whose detail fetch failed (non-fatal).
    pub entries_failed: u32,
    /// Number of times a proxy was placed on cooldown during the run.
    pub ban_events: u32,
    /// Torrents successfully added to the client.
    pub adds_succeeded: u32,
    /// Torrents rejected by the client (non-critical, per-torrent).
    pub adds_rejected: u32,
    /// Torrents that failed to add due to a network/auth error.
    pub adds_failed: u32,
}

/// Outcome of a single pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    /// Final classification.
    pub outcome: RunOutcome,
    /// Per-step counters.
    pub counts: RunCounts,
    /// Recent log excerpts selected for the notification body.
    pub log_excerpts: Vec<String>,
    /// Ban records appended during this run.
    pub ban_ledger_delta: Vec<BanRecord>,
}

impl RunStatus {
    /// The process exit code for this status.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn magnet_rejects_non_magnet_uri() {
        assert!(Magnet::new("https://example.com", "n", [], None, "1G", "today").is_err());
        assert!(Magnet::new("magnet:?xt=urn:btih:abc", "n", [], None, "1G", "today").is_ok());
    }

    #[test]
    fn magnet_tags_normalize_lowercase() {
        let m = Magnet::new(
            "magnet:?xt=urn:btih:abc",
            "n",
            ["Subtitle".to_string(), "4K".to_string()],
            None,
            "1G",
            "today",
        )
        .unwrap();
        assert!(m.has_tag("subtitle"));
        assert!(m.has_tag("4k"));
    }

    #[test]
    fn history_mark_is_first_write_wins() {
        let mut rec = HistoryRecord::new("href", Phase::One, "ABC-123", ts(100));
        assert!(rec.mark(TorrentType::Subtitle, ts(200)));
        assert_eq!(rec.column(TorrentType::Subtitle), Some(ts(200)));
        // Second write to the same column must not clear or move the stamp.
        assert!(!rec.mark(TorrentType::Subtitle, ts(300)));
        assert_eq!(rec.column(TorrentType::Subtitle), Some(ts(200)));
        assert_eq!(rec.update_date, ts(200));
    }

    #[test]
    fn history_create_le_update_holds_after_mark() {
        let mut rec = HistoryRecord::new("href", Phase::One, "ABC-123", ts(100));
        rec.mark(TorrentType::HackedSubtitle, ts(500));
        assert!(rec.create_date <= rec.update_date);
    }

    #[test]
    fn report_row_downloaded_marker_is_idempotent() {
        let mut row = ReportRow {
            href: "h".into(),
            video_code: "ABC".into(),
            title: "t".into(),
            page: 1,
            actor: None,
            rating: None,
            comment_count: None,
            magnets: [
                "magnet:?xt=urn:btih:a".into(),
                String::new(),
                String::new(),
                String::new(),
            ],
            sizes: [String::new(), String::new(), String::new(), String::new()],
        };
        row.mark_downloaded(TorrentType::HackedSubtitle);
        row.mark_downloaded(TorrentType::HackedSubtitle);
        assert_eq!(
            row.magnet_cell(TorrentType::HackedSubtitle),
            "[DOWNLOADED] magnet:?xt=urn:btih:a"
        );
        assert!(row.is_marked_downloaded(TorrentType::HackedSubtitle));
        assert!(row.is_absent(TorrentType::Subtitle));
    }

    #[test]
    fn ban_record_expiry_boundary_is_exclusive() {
        let rec = BanRecord {
            proxy_name: "p1".into(),
            proxy_host: "host".into(),
            banned_at: ts(0),
            expires_at: ts(100),
            reason: FailureKind::Ban,
            description: "three 403s".into(),
        };
        assert!(!rec.is_active(ts(100)));
        assert!(rec.is_active(ts(99)));
    }

    #[test]
    fn run_outcome_exit_codes_match_ip8() {
        assert_eq!(RunOutcome::Success.exit_code(), 0);
        assert_eq!(RunOutcome::SuccessEmpty.exit_code(), 0);
        assert_eq!(RunOutcome::FailedCritical.exit_code(), 1);
        assert_eq!(RunOutcome::FailedProxyBanned.exit_code(), 2);
    }
}
