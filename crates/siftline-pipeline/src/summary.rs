//! Structured JSON summary of a run, suitable for the out-of-scope email
//! transport to embed verbatim as the notification body.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use siftline_core::{BanRecord, RunCounts, RunOutcome};

/// JSON-serializable notification body summarizing one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    outcome: RunOutcome,
    counts: RunCounts,
    ban_events: usize,
    log_excerpt_count: usize,
    step_durations_ms: BTreeMap<String, u64>,
}

impl RunSummary {
    /// Build a summary from the final outcome, counters, ban ledger delta,
    /// captured log excerpts, and per-step wall-clock durations.
    #[must_use]
    pub fn new(
        outcome: RunOutcome,
        counts: RunCounts,
        ban_ledger_delta: &[BanRecord],
        log_excerpts: &[String],
        step_durations: &[(&str, Duration)],
    ) -> Self {
        let step_durations_ms = step_durations
            .iter()
            .map(|(name, duration)| ((*name).to_string(), u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)))
            .collect();
        Self {
            outcome,
            counts,
            ban_events: ban_ledger_delta.len(),
            log_excerpt_count: log_excerpts.len(),
            step_durations_ms,
        }
    }

    /// Render as a pretty-printed JSON document.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_renders_step_durations_and_counts() {
        let counts = RunCounts { adds_succeeded: 3, ..RunCounts::default() };
        let summary = RunSummary::new(
            RunOutcome::Success,
            counts,
            &[],
            &["line one".to_string()],
            &[("scraper", Duration::from_millis(150)), ("uploader", Duration::from_millis(40))],
        );

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"adds_succeeded\": 3"));
        assert!(json.contains("\"scraper\": 150"));
        assert!(json.contains("\"log_excerpt_count\": 1"));
    }
}
