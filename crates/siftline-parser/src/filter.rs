//! Quality filters: admission rules evaluated on parsed fields, never on raw
//! HTML (§4.3).

use siftline_config::ScraperConfig;
use siftline_core::Entry;

use crate::tags::{CHINESE_SUBTITLE, RECENT_RELEASE};

/// Per-run overrides to the filter rules, sourced from configuration or a
/// CLI flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOverrides {
    /// Suppress the release-date recency gate in phase 1.
    pub skip_release_date_gate: bool,
}

/// Phase 1 admission: requires the Chinese-subtitle tag, and (unless
/// overridden) the recent-release tag.
#[must_use]
pub fn phase_1_admits(entry: &Entry, overrides: FilterOverrides) -> bool {
    if !entry.has_tag(CHINESE_SUBTITLE) {
        return false;
    }
    overrides.skip_release_date_gate || entry.has_tag(RECENT_RELEASE)
}

/// Phase 2 admission: requires the recent-release tag plus both quality
/// thresholds. A missing rating or comment count makes the entry ineligible
/// rather than defaulting to a pass.
#[must_use]
pub fn phase_2_admits(entry: &Entry, config: &ScraperConfig) -> bool {
    if !entry.has_tag(RECENT_RELEASE) {
        return false;
    }
    let Some(rating) = entry.rating else { return false };
    let Some(comment_count) = entry.comment_count else { return false };
    rating >= config.phase_2_min_rate && comment_count >= config.phase_2_min_comments
}
