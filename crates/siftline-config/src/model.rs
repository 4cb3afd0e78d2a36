//! Typed configuration documents.
//!
//! # Design
//! - Pure data carriers, deserialised once at startup and treated as immutable
//!   thereafter. No section here is mutable at runtime; operators change
//!   behaviour by editing the file and restarting a run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Proxy selection strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Route every request through a single fixed proxy.
    Single,
    /// Rotate across a pool, honoring per-proxy cooldowns.
    Pool,
}

/// Subsystem a proxy may be scoped to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProxyModule {
    /// Index page fetches.
    SpiderIndex,
    /// Detail page fetches.
    SpiderDetail,
    /// Age-verification interstitial handling.
    SpiderAgeVerification,
    /// Torrent client HTTP API.
    Qbittorrent,
    /// Deep-storage bridge HTTP API.
    Pikpak,
    /// Every module above.
    All,
}

/// Proxy pool configuration (C1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Selection strategy.
    pub mode: ProxyMode,
    /// Candidate proxy URLs when `mode` is `pool`.
    #[serde(default)]
    pub pool: Vec<String>,
    /// Cooldown duration applied after a ban, in seconds.
    #[serde(default = "defaults::cooldown_seconds")]
    pub cooldown_seconds: u64,
    /// Consecutive failures tolerated before a proxy is banned.
    #[serde(default = "defaults::max_failures")]
    pub max_failures: u32,
    /// Subsystems this pool applies to.
    #[serde(default)]
    pub modules: Vec<ProxyModule>,
}

/// Challenge-bypass service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BypassConfig {
    /// Whether requests should be rewritten through the bypass service.
    pub enabled: bool,
    /// Local port the bypass service listens on.
    pub service_port: u16,
}

/// Scraper engine configuration (C3/C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// First index page to fetch.
    #[serde(default = "defaults::start_page")]
    pub start_page: u32,
    /// Last index page to fetch, ignored when `all_mode` is set.
    pub end_page: u32,
    /// Continue until an empty index page is observed, overriding `end_page`.
    #[serde(default)]
    pub all_mode: bool,
    /// Minimum rating an entry must carry to qualify for phase 2.
    #[serde(default = "defaults::phase_2_min_rate")]
    pub phase_2_min_rate: f32,
    /// Minimum comment count an entry must carry to qualify for phase 2.
    #[serde(default = "defaults::phase_2_min_comments")]
    pub phase_2_min_comments: u32,
    /// Delay between detail page fetches, in milliseconds.
    #[serde(default = "defaults::detail_sleep_ms")]
    pub detail_sleep_ms: u64,
    /// Delay between index page fetches, in milliseconds.
    #[serde(default = "defaults::page_sleep_ms")]
    pub page_sleep_ms: u64,
    /// Delay between entry evaluations, in milliseconds.
    #[serde(default = "defaults::entry_sleep_ms")]
    pub entry_sleep_ms: u64,
    /// Skip the release-date recency gate.
    #[serde(default)]
    pub ignore_release_date: bool,
    /// Catalog base URL.
    pub base_url: String,
}

/// Torrent client configuration (C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentClientConfig {
    /// Client host name or address.
    pub host: String,
    /// Client Web-UI port.
    pub port: u16,
    /// Login username.
    pub user: String,
    /// Login password.
    pub pass: String,
    /// Category applied to torrents added from daily runs.
    pub category_daily: String,
    /// Category applied to torrents added from ad-hoc runs.
    pub category_adhoc: String,
    /// Destination save path for added torrents.
    pub save_path: String,
    /// Start torrents immediately after adding them.
    pub auto_start: bool,
    /// Skip hash checking after adding a torrent.
    pub skip_checking: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Delay enforced between consecutive add calls, in milliseconds.
    #[serde(default = "defaults::inter_add_delay_ms")]
    pub inter_add_delay_ms: u64,
}

/// History store configuration (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Path to the history CSV table.
    pub path: PathBuf,
}

/// Deep-storage bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepStorageConfig {
    /// Login email.
    pub email: String,
    /// Login password.
    pub pass: String,
    /// Minimum delay enforced between requests, in milliseconds.
    #[serde(default = "defaults::deep_storage_request_delay_ms")]
    pub request_delay_ms: u64,
}

/// Root configuration document, loaded once at process startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scraper engine settings.
    pub scraper: ScraperConfig,
    /// Proxy pool settings.
    pub proxy: ProxyConfig,
    /// Challenge-bypass service settings.
    pub bypass: BypassConfig,
    /// Torrent client settings.
    pub torrent_client: TorrentClientConfig,
    /// History store settings.
    pub history: HistoryConfig,
    /// Deep-storage bridge settings.
    pub deep_storage: DeepStorageConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_module_roundtrips_snake_case() {
        let value = serde_yaml::to_string(&ProxyModule::SpiderAgeVerification).unwrap();
        assert_eq!(value.trim(), "spider_age_verification");
    }

    #[test]
    fn proxy_mode_roundtrips_lowercase() {
        let value = serde_yaml::to_string(&ProxyMode::Pool).unwrap();
        assert_eq!(value.trim(), "pool");
    }
}
