//! The torrent-client contract the uploader depends on (§6's abstract
//! operations): `login`, `add`, `list_recent`, `delete`. Wire format is an
//! implementation detail of whoever implements the trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use siftline_core::IngestResult;

/// Result of a single `add` call. `NetworkError`/`Auth` failures are
/// reported as `Err` instead of a variant here, matching how the rest of
/// the ingestion core distinguishes recoverable outcomes from errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The client accepted the torrent.
    Added,
    /// The client rejected the torrent (duplicate, malformed magnet, etc).
    /// Per-torrent and non-critical.
    Rejected,
}

/// A torrent the client already knows about, as returned by `list_recent`.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentHandle {
    /// Info-hash identifying the torrent.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Category assigned at add time.
    pub category: String,
    /// When the torrent was added, per the client's own clock.
    pub added_at: DateTime<Utc>,
}

/// An HTTP Web-UI-style torrent client.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Authenticate. The uploader calls this once per run and caches the
    /// resulting session for subsequent calls.
    ///
    /// # Errors
    /// Returns [`siftline_core::IngestError::Auth`] on rejected credentials.
    async fn login(&self) -> IngestResult<()>;

    /// Add a torrent by magnet URI.
    ///
    /// # Errors
    /// Returns [`siftline_core::IngestError::Auth`] if the session has
    /// expired, or [`siftline_core::IngestError::Network`] on a transport
    /// failure. A client-side rejection is `Ok(AddOutcome::Rejected)`, not
    /// an error.
    async fn add(
        &self,
        magnet: &str,
        category: &str,
        save_path: &str,
        auto_start: bool,
        skip_checking: bool,
    ) -> IngestResult<AddOutcome>;

    /// List torrents added since `since` in any of `categories`, used by the
    /// deep-storage bridge step to find candidates older than its retention
    /// window.
    ///
    /// # Errors
    /// Returns an error on authentication or transport failure.
    async fn list_recent(&self, since: DateTime<Utc>, categories: &[String]) -> IngestResult<Vec<TorrentHandle>>;

    /// Remove a torrent, optionally deleting its data.
    ///
    /// # Errors
    /// Returns an error on authentication or transport failure.
    async fn delete(&self, hash: &str, delete_files: bool) -> IngestResult<()>;
}
