//! `TorrentClient` implementation against a qBittorrent-style Web UI API.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client as ReqwestClient, StatusCode, Url};
use serde::Deserialize;
use siftline_config::TorrentClientConfig;
use siftline_core::{IngestError, IngestResult};

use crate::client::{AddOutcome, TorrentClient, TorrentHandle};

/// HTTP-backed torrent client. Holds a cookie-enabled `reqwest::Client`, so a
/// successful [`TorrentClient::login`] leaves the session cookie attached to
/// every subsequent request on `self`.
pub struct HttpTorrentClient {
    http: ReqwestClient,
    base_url: Url,
    user: String,
    pass: String,
}

impl HttpTorrentClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the configured host/port do not form a valid URL
    /// or the underlying HTTP client cannot be constructed.
    pub fn new(config: &TorrentClientConfig) -> IngestResult<Self> {
        let http = ReqwestClient::builder()
            .cookie_store(true)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|source| IngestError::Network { message: source.to_string() })?;

        let base_url = Url::parse(&format!("http://{}:{}", config.host, config.port))
            .map_err(|source| IngestError::Parse { message: format!("building torrent client URL: {source}") })?;

        Ok(Self { http, base_url, user: config.user.clone(), pass: config.pass.clone() })
    }

    fn endpoint(&self, path: &str) -> IngestResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| IngestError::Parse { message: format!("building torrent client endpoint: {source}") })
    }
}

fn network_error(source: &reqwest::Error) -> IngestError {
    IngestError::Network { message: source.to_string() }
}

#[derive(Debug, Deserialize)]
struct TorrentInfo {
    hash: String,
    name: String,
    category: String,
    added_on: i64,
}

#[async_trait::async_trait]
impl TorrentClient for HttpTorrentClient {
    async fn login(&self) -> IngestResult<()> {
        let url = self.endpoint("api/v2/auth/login")?;
        let response = self
            .http
            .post(url)
            .form(&[("username", self.user.as_str()), ("password", self.pass.as_str())])
            .send()
            .await
            .map_err(|source| network_error(&source))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(IngestError::Auth { message: format!("login rejected with status {}", response.status()) })
        }
    }

    async fn add(
        &self,
        magnet: &str,
        category: &str,
        save_path: &str,
        auto_start: bool,
        skip_checking: bool,
    ) -> IngestResult<AddOutcome> {
        let url = self.endpoint("api/v2/torrents/add")?;
        let form = [
            ("urls", magnet.to_string()),
            ("category", category.to_string()),
            ("savepath", save_path.to_string()),
            ("paused", (!auto_start).to_string()),
            ("skip_checking", skip_checking.to_string()),
        ];

        let response = self.http.post(url).form(&form).send().await.map_err(|source| network_error(&source))?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(IngestError::Auth { message: "torrent client session expired".into() });
        }
        let status = response.status();
        let body = response.text().await.map_err(|source| network_error(&source))?;
        if status.is_success() && body.trim().eq_ignore_ascii_case("ok.") {
            Ok(AddOutcome::Added)
        } else {
            Ok(AddOutcome::Rejected)
        }
    }

    async fn list_recent(&self, since: DateTime<Utc>, categories: &[String]) -> IngestResult<Vec<TorrentHandle>> {
        let mut url = self.endpoint("api/v2/torrents/info")?;
        url.query_pairs_mut().append_pair("sort", "added_on").append_pair("reverse", "true");

        let response = self.http.get(url).send().await.map_err(|source| network_error(&source))?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(IngestError::Auth { message: "torrent client session expired".into() });
        }
        let torrents: Vec<TorrentInfo> = response.json().await.map_err(|source| network_error(&source))?;

        Ok(torrents
            .into_iter()
            .filter(|t| categories.is_empty() || categories.iter().any(|c| c == &t.category))
            .filter_map(|t| {
                let added_at = Utc.timestamp_opt(t.added_on, 0).single()?;
                (added_at >= since).then_some(TorrentHandle { hash: t.hash, name: t.name, category: t.category, added_at })
            })
            .collect())
    }

    async fn delete(&self, hash: &str, delete_files: bool) -> IngestResult<()> {
        let mut url = self.endpoint("api/v2/torrents/delete")?;
        url.query_pairs_mut().append_pair("hashes", hash).append_pair("deleteFiles", &delete_files.to_string());

        let response = self.http.get(url).send().await.map_err(|source| network_error(&source))?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(IngestError::Auth { message: "torrent client session expired".into() });
        }
        Ok(())
    }
}
