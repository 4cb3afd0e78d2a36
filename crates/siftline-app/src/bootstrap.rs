//! Wires loaded configuration and parsed CLI overrides into a
//! [`PipelineOrchestrator`] and runs it to completion.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use siftline_config::Config;
use siftline_events::EventBus;
use siftline_http::HttpClient;
use siftline_pipeline::{NullDeepStorageBridge, PipelineOrchestrator, PipelineOutcome};
use siftline_proxy::ProxyPool;
use siftline_scraper::ScraperEngine;
use siftline_telemetry::LogExcerptCollector;
use siftline_uploader::{HttpTorrentClient, TorrentClient, UploaderEngine};
use tracing::info;

use crate::cli::Cli;
use crate::error::{AppError, AppResult};

/// Torrents older than this are offered to the deep-storage bridge (§4.8 step
/// 5). No configuration field names a window, so this crate picks the
/// default rather than inventing one.
const DEEP_STORAGE_RETENTION_DAYS: i64 = 30;

/// Load configuration, build every collaborator, and run the pipeline once.
///
/// # Errors
/// Returns an error only if bootstrap itself fails (config load, proxy
/// ledger read, torrent client construction, telemetry init); failures
/// during the run itself are captured in the returned `PipelineOutcome`,
/// never surfaced as an `Err` here.
pub async fn run(cli: &Cli) -> AppResult<PipelineOutcome> {
    let logging = siftline_telemetry::LoggingConfig::default();
    siftline_telemetry::init_logging(&logging).map_err(|source| AppError::Telemetry { reason: format!("{source:#}") })?;

    info!(config = %cli.config.display(), "loading configuration");
    let config = siftline_config::load(&cli.config).map_err(|source| AppError::config(cli.config.clone(), source))?;

    let events = Arc::new(EventBus::new());
    let (log_excerpts, _log_excerpt_worker) = LogExcerptCollector::spawn();

    let proxy_pool = build_proxy_pool(cli, &config)?;
    let http = Arc::new(HttpClient::new(proxy_pool.clone(), build_bypass(cli, &config)));

    let run_options = cli.resolve_run_options(&config.scraper);
    let report_path = run_options
        .output_file
        .clone()
        .unwrap_or_else(|| default_report_path(run_options.mode));

    let scraper = ScraperEngine::new(Arc::clone(&http), config.scraper.clone(), run_options.clone(), Some(Arc::clone(&events)));

    let torrent_client: Arc<dyn TorrentClient> =
        Arc::new(HttpTorrentClient::new(&config.torrent_client).map_err(|source| AppError::TorrentClient { source })?);
    let uploader = UploaderEngine::new(
        Arc::clone(&torrent_client),
        config.torrent_client.clone(),
        run_options.mode,
        run_options.dry_run,
        Some(Arc::clone(&events)),
    );

    let bridge = Arc::new(NullDeepStorageBridge);
    let bridge_categories = vec![config.torrent_client.category_daily.clone(), config.torrent_client.category_adhoc.clone()];

    let orchestrator = PipelineOrchestrator::new(
        scraper,
        uploader,
        torrent_client,
        bridge,
        proxy_pool,
        Some(log_excerpts),
        Some(events),
        config.history.path.clone(),
        ChronoDuration::days(DEEP_STORAGE_RETENTION_DAYS),
        bridge_categories,
    );

    info!(report = %report_path.display(), "starting run");
    Ok(orchestrator.run(&report_path).await)
}

/// `--use-proxy` (or a pool configured for at least one module) constructs a
/// pool; otherwise every request connects directly.
fn build_proxy_pool(cli: &Cli, config: &Config) -> AppResult<Option<Arc<ProxyPool>>> {
    if !cli.use_proxy && config.proxy.modules.is_empty() {
        return Ok(None);
    }
    let ledger_path = config.history.path.with_file_name("proxy_ban_ledger.csv");
    let pool = ProxyPool::new(&config.proxy, ledger_path).map_err(|source| AppError::ProxyPool { source })?;
    Ok(Some(Arc::new(pool)))
}

/// `--use-bypass` forces the challenge-bypass rewrite on regardless of the
/// configured `enabled` flag; otherwise the configured value is honored.
fn build_bypass(cli: &Cli, config: &Config) -> Option<siftline_config::BypassConfig> {
    if cli.use_bypass {
        return Some(siftline_config::BypassConfig { enabled: true, ..config.bypass.clone() });
    }
    config.bypass.enabled.then(|| config.bypass.clone())
}

fn default_report_path(mode: siftline_core::RunMode) -> std::path::PathBuf {
    let run_id = uuid_like_run_id();
    siftline_scraper::conventional_path(std::path::Path::new("reports"), mode, chrono::Utc::now(), &run_id)
}

/// A short, sortable run identifier. Avoids pulling in the `uuid` crate for a
/// report filename that only needs to be unique within a day.
fn uuid_like_run_id() -> String {
    chrono::Utc::now().format("run-%Y%m%d%H%M%S%3f").to_string()
}

/// Map a completed run's outcome to the process exit code it publishes.
#[must_use]
pub fn exit_code(outcome: &PipelineOutcome) -> i32 {
    outcome.status.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_sortable_and_unique_enough_for_one_invocation() {
        let first = uuid_like_run_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = uuid_like_run_id();
        assert!(second >= first);
    }

    #[test]
    fn default_report_path_uses_conventional_layout() {
        let path = default_report_path(siftline_core::RunMode::Daily);
        assert!(path.starts_with("reports/DailyReport"));
    }
}
