//! On-disk row schemas: the current per-type-column layout, and the legacy
//! single-column layout it migrates from (§4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siftline_core::{HistoryRecord, Phase, TorrentType};

/// Current on-disk schema: one nullable timestamp column per `TorrentType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HistoryRow {
    pub href: String,
    pub phase: u8,
    pub video_code: String,
    pub create_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
    pub hacked_subtitle: Option<DateTime<Utc>>,
    pub hacked_no_subtitle: Option<DateTime<Utc>>,
    pub subtitle: Option<DateTime<Utc>>,
    pub no_subtitle: Option<DateTime<Utc>>,
}

/// Header field present in the current schema but never in the legacy one;
/// used to tell the two apart on load.
pub(crate) const CURRENT_SCHEMA_MARKER: &str = "hacked_subtitle";

/// The legacy schema: a single generic `downloaded_at` column with no phase
/// or per-type breakdown.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LegacyHistoryRow {
    pub href: String,
    pub video_code: String,
    pub downloaded_at: DateTime<Utc>,
}

impl From<&HistoryRecord> for HistoryRow {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            href: record.href.clone(),
            phase: record.phase.as_u8(),
            video_code: record.video_code.clone(),
            create_date: record.create_date,
            update_date: record.update_date,
            hacked_subtitle: record.column(TorrentType::HackedSubtitle),
            hacked_no_subtitle: record.column(TorrentType::HackedNoSubtitle),
            subtitle: record.column(TorrentType::Subtitle),
            no_subtitle: record.column(TorrentType::NoSubtitle),
        }
    }
}

impl HistoryRow {
    /// Reconstruct a `HistoryRecord`, failing only if `phase` is out of the
    /// closed `{1, 2}` range — a corrupt file, not a legal migration case.
    pub(crate) fn into_record(self) -> Result<HistoryRecord, String> {
        let phase = Phase::from_u8(self.phase).ok_or_else(|| format!("invalid phase {} for {}", self.phase, self.href))?;
        let mut record = HistoryRecord::new(self.href, phase, self.video_code, self.create_date);
        for (kind, value) in [
            (TorrentType::HackedSubtitle, self.hacked_subtitle),
            (TorrentType::HackedNoSubtitle, self.hacked_no_subtitle),
            (TorrentType::Subtitle, self.subtitle),
            (TorrentType::NoSubtitle, self.no_subtitle),
        ] {
            if let Some(at) = value {
                record.mark(kind, at);
            }
        }
        // `mark` only bumps `update_date` forward; restore the on-disk value,
        // which may legitimately be newer than every per-type timestamp.
        record.update_date = self.update_date;
        Ok(record)
    }
}

impl From<LegacyHistoryRow> for HistoryRecord {
    fn from(legacy: LegacyHistoryRow) -> Self {
        HistoryRecord::new(legacy.href, Phase::One, legacy.video_code, legacy.downloaded_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_current_schema() {
        let mut record = HistoryRecord::new("href", Phase::Two, "ABC-123", DateTime::from_timestamp(1_000, 0).unwrap());
        record.mark(TorrentType::Subtitle, DateTime::from_timestamp(2_000, 0).unwrap());

        let row = HistoryRow::from(&record);
        let restored = row.into_record().unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn legacy_row_becomes_phase_one_with_null_columns() {
        let legacy = LegacyHistoryRow {
            href: "href".into(),
            video_code: "ABC-123".into(),
            downloaded_at: DateTime::from_timestamp(500, 0).unwrap(),
        };
        let record: HistoryRecord = legacy.into();
        assert_eq!(record.phase, Phase::One);
        assert_eq!(record.create_date, DateTime::from_timestamp(500, 0).unwrap());
        assert!(TorrentType::ALL.iter().all(|&t| !record.is_downloaded(t)));
    }
}
