//! Run-scoped options resolved from configuration and CLI overrides (§6).

use std::path::PathBuf;
use std::time::Duration;

use siftline_core::{Phase, RunMode};

/// Which phase(s) a run should execute, matching the CLI's `phase ∈ {1, 2,
/// all}` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSelection {
    /// Subtitle-centric pass only.
    One,
    /// Quality-threshold pass only.
    Two,
    /// Both passes, phase 1 before phase 2.
    All,
}

impl PhaseSelection {
    /// The ordered sequence of phases this selection runs.
    #[must_use]
    pub fn phases(self) -> Vec<Phase> {
        match self {
            Self::One => vec![Phase::One],
            Self::Two => vec![Phase::Two],
            Self::All => vec![Phase::One, Phase::Two],
        }
    }
}

/// Resolved, immutable parameters for one scraper invocation: the merge of
/// `ScraperConfig` defaults with whatever the CLI overrode (§6).
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Phase(s) to execute.
    pub phase: PhaseSelection,
    /// First index page to fetch.
    pub start_page: u32,
    /// Last index page to fetch, ignored when `all_mode` is set.
    pub end_page: u32,
    /// Continue until an empty index page is observed.
    pub all_mode: bool,
    /// Starting catalog URL. A custom (non-default) value implies
    /// `mode == RunMode::AdHoc`.
    pub base_url: String,
    /// Daily sweep or ad-hoc crawl; selects the report folder and (via the
    /// uploader) the torrent-client category.
    pub mode: RunMode,
    /// Force every `TorrentType` to be reprocessed regardless of history.
    pub ignore_history: bool,
    /// Suppress phase 1's release-date recency gate.
    pub ignore_release_date: bool,
    /// Process everything but commit no ReportRows and call no history merge.
    pub dry_run: bool,
    /// Upper bound on concurrent detail-page fetches (§5's K, default 1).
    pub detail_concurrency: usize,
    /// Soft wall-clock budget for the whole run.
    pub wall_clock_budget: Option<Duration>,
    /// Explicit report path override, replacing the conventional dated path.
    pub output_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selection_runs_phase_one_before_phase_two() {
        assert_eq!(PhaseSelection::All.phases(), vec![Phase::One, Phase::Two]);
    }

    #[test]
    fn single_phase_selections_run_one_phase() {
        assert_eq!(PhaseSelection::One.phases(), vec![Phase::One]);
        assert_eq!(PhaseSelection::Two.phases(), vec![Phase::Two]);
    }
}
