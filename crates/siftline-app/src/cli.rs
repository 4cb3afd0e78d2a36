//! Command-line surface (§6): flags operators use to override the loaded
//! configuration for a single run. Parsing itself is `clap`'s job; this
//! module only names the flags and resolves them against a loaded
//! `siftline_config::Config` into a `siftline_scraper::RunOptions`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use siftline_core::RunMode;
use siftline_scraper::{PhaseSelection, RunOptions};

/// Which phase(s) to run, mirroring `siftline_scraper::PhaseSelection`.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PhaseArg {
    /// Subtitle-centric pass only.
    #[value(name = "1")]
    One,
    /// Quality-threshold pass only.
    #[value(name = "2")]
    Two,
    /// Both passes, phase 1 before phase 2.
    All,
}

impl From<PhaseArg> for PhaseSelection {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::One => Self::One,
            PhaseArg::Two => Self::Two,
            PhaseArg::All => Self::All,
        }
    }
}

/// One pipeline invocation's command-line overrides.
#[derive(Parser, Debug)]
#[command(name = "siftline", about = "Two-phase content ingestion pipeline")]
pub struct Cli {
    /// Path to the YAML configuration document.
    #[arg(long, env = "SIFTLINE_CONFIG", default_value = "siftline.yaml")]
    pub config: PathBuf,

    /// Which phase(s) to run.
    #[arg(long, value_enum, default_value_t = PhaseArg::All)]
    pub phase: PhaseArg,

    /// First index page to fetch, overriding the configured `start_page`.
    #[arg(long)]
    pub start_page: Option<u32>,

    /// Last index page to fetch, overriding the configured `end_page`.
    #[arg(long)]
    pub end_page: Option<u32>,

    /// Continue until an empty index page is observed, ignoring `end_page`.
    #[arg(long)]
    pub all_pages: bool,

    /// Custom starting catalog URL; implies an ad-hoc run.
    #[arg(long)]
    pub url: Option<String>,

    /// Force every torrent type to be reprocessed regardless of history.
    #[arg(long)]
    pub ignore_history: bool,

    /// Suppress phase 1's release-date recency gate.
    #[arg(long)]
    pub ignore_release_date: bool,

    /// Route requests through the configured proxy pool.
    #[arg(long)]
    pub use_proxy: bool,

    /// Rewrite requests through the configured challenge-bypass service.
    #[arg(long)]
    pub use_bypass: bool,

    /// Process everything but commit no report rows, history merges, or
    /// torrent adds.
    #[arg(long)]
    pub dry_run: bool,

    /// Explicit report path, overriding the conventional dated path.
    #[arg(long)]
    pub output_file: Option<PathBuf>,
}

impl Cli {
    /// Whether `--url` selects an ad-hoc run.
    #[must_use]
    pub fn run_mode(&self) -> RunMode {
        if self.url.is_some() { RunMode::AdHoc } else { RunMode::Daily }
    }

    /// Resolve these overrides against loaded scraper configuration into the
    /// options `ScraperEngine` consumes.
    #[must_use]
    pub fn resolve_run_options(&self, scraper: &siftline_config::ScraperConfig) -> RunOptions {
        RunOptions {
            phase: self.phase.into(),
            start_page: self.start_page.unwrap_or(scraper.start_page),
            end_page: self.end_page.unwrap_or(scraper.end_page),
            all_mode: self.all_pages || scraper.all_mode,
            base_url: self.url.clone().unwrap_or_else(|| scraper.base_url.clone()),
            mode: self.run_mode(),
            ignore_history: self.ignore_history,
            ignore_release_date: self.ignore_release_date || scraper.ignore_release_date,
            dry_run: self.dry_run,
            detail_concurrency: 1,
            wall_clock_budget: None,
            output_file: self.output_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scraper_config() -> siftline_config::ScraperConfig {
        siftline_config::ScraperConfig {
            start_page: 1,
            end_page: 10,
            all_mode: false,
            phase_2_min_rate: 4.0,
            phase_2_min_comments: 80,
            detail_sleep_ms: 1_500,
            page_sleep_ms: 3_000,
            entry_sleep_ms: 250,
            ignore_release_date: false,
            base_url: "https://catalog.example".to_string(),
        }
    }

    #[test]
    fn custom_url_selects_ad_hoc_mode() {
        let cli = Cli::parse_from(["siftline", "--url", "https://catalog.example/actor/1"]);
        assert_eq!(cli.run_mode(), RunMode::AdHoc);
    }

    #[test]
    fn default_run_is_daily_and_uses_config_base_url() {
        let cli = Cli::parse_from(["siftline"]);
        assert_eq!(cli.run_mode(), RunMode::Daily);
        let options = cli.resolve_run_options(&sample_scraper_config());
        assert_eq!(options.base_url, "https://catalog.example");
        assert_eq!(options.start_page, 1);
        assert_eq!(options.end_page, 10);
    }

    #[test]
    fn page_overrides_take_precedence_over_config() {
        let cli = Cli::parse_from(["siftline", "--start-page", "5", "--end-page", "9", "--all-pages"]);
        let options = cli.resolve_run_options(&sample_scraper_config());
        assert_eq!(options.start_page, 5);
        assert_eq!(options.end_page, 9);
        assert!(options.all_mode);
    }
}
