//! The deep-storage bridge contract (§6): an out-of-scope collaborator
//! specified only by the operations the orchestrator invokes on it. No wire
//! format is given in configuration (§6's `deep_storage` section carries
//! only `email`/`pass`/`request_delay_ms`, no host), so unlike the torrent
//! client this crate ships no concrete HTTP implementation — operators wire
//! their own [`DeepStorageBridge`] for the service they actually run.

use async_trait::async_trait;
use siftline_core::IngestResult;

/// Per-magnet status returned by [`DeepStorageBridge::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeItemStatus {
    /// Archived successfully.
    Ok,
    /// Still being processed by the remote service.
    Pending,
    /// The remote service rejected or failed to archive this item.
    Failed,
}

/// Abstract deep-storage bridge: login, submit a batch of magnets older than
/// the retention window, and poll the batch's per-item outcome.
#[async_trait]
pub trait DeepStorageBridge: Send + Sync {
    /// Authenticate with the remote service.
    ///
    /// # Errors
    /// Returns [`siftline_core::IngestError::Auth`] on rejected credentials,
    /// or [`siftline_core::IngestError::Network`] if the service is
    /// unreachable.
    async fn login(&self) -> IngestResult<()>;

    /// Submit a batch of magnet URIs and return an opaque batch id.
    ///
    /// # Errors
    /// Returns an error on authentication or transport failure.
    async fn submit_batch(&self, magnets: &[String]) -> IngestResult<String>;

    /// Poll a previously submitted batch's per-item outcome.
    ///
    /// # Errors
    /// Returns an error on authentication or transport failure.
    async fn status(&self, batch_id: &str) -> IngestResult<Vec<BridgeItemStatus>>;
}

/// A bridge that archives nothing, for deployments that don't run a
/// deep-storage step, or as a placeholder until a real one is wired in.
pub struct NullDeepStorageBridge;

#[async_trait]
impl DeepStorageBridge for NullDeepStorageBridge {
    async fn login(&self) -> IngestResult<()> {
        Ok(())
    }

    async fn submit_batch(&self, _magnets: &[String]) -> IngestResult<String> {
        Ok(String::new())
    }

    async fn status(&self, _batch_id: &str) -> IngestResult<Vec<BridgeItemStatus>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_bridge_accepts_and_reports_nothing() {
        let bridge = NullDeepStorageBridge;
        bridge.login().await.unwrap();
        let batch_id = bridge.submit_batch(&["magnet:?xt=urn:btih:abc".into()]).await.unwrap();
        assert!(bridge.status(&batch_id).await.unwrap().is_empty());
    }
}
