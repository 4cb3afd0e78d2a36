#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! In-process event bus carrying run progress events.
//!
//! The orchestrator (C8) and scraper (C6) publish [`RunEvent`]s as they make
//! progress; the telemetry crate and the pipeline's own log-excerpt collector
//! both subscribe. Internally this uses `tokio::broadcast` with a bounded
//! replay buffer, matching the teacher's SSE-facing event bus, stripped of
//! the torrent-engine-specific payloads it does not need here.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use siftline_core::{FailureKind, RunOutcome, TorrentType};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::error;

mod error;
pub use error::{EventBusError, EventBusResult};

/// Identifier assigned to each event published on the bus.
pub type EventId = u64;

/// Default in-memory replay buffer size.
const DEFAULT_REPLAY_CAPACITY: usize = 512;

/// Progress events emitted while a run is in flight.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// An index page fetch was attempted.
    PageFetched {
        /// Page number fetched.
        page: u32,
        /// Whether the fetch succeeded.
        ok: bool,
    },
    /// An entry was admitted by the phase filter and selected for processing.
    EntrySelected {
        /// Entry's catalog code.
        video_code: String,
        /// Torrent types still needed for this entry.
        needed: Vec<TorrentType>,
    },
    /// A detail page fetch failed (non-fatal; entry recorded as `detail_failed`).
    DetailFailed {
        /// Entry's catalog code.
        video_code: String,
        /// Human-readable failure description.
        message: String,
    },
    /// A proxy failure was reported to the pool.
    ProxyFailure {
        /// Display name of the proxy.
        proxy_name: String,
        /// Classification of the failure.
        kind: FailureKind,
    },
    /// A proxy was placed on cooldown.
    ProxyBanned {
        /// Display name of the proxy.
        proxy_name: String,
        /// Cooldown expiry.
        expires_at: DateTime<Utc>,
    },
    /// A torrent add attempt against the client completed.
    UploadResult {
        /// Entry's catalog code.
        video_code: String,
        /// Torrent type uploaded.
        kind: TorrentType,
        /// Whether the add succeeded.
        ok: bool,
    },
    /// The run finished with a final outcome.
    RunFinished {
        /// Final classification.
        outcome: RunOutcome,
    },
}

impl RunEvent {
    /// Machine-friendly discriminator for log correlation.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PageFetched { .. } => "page_fetched",
            Self::EntrySelected { .. } => "entry_selected",
            Self::DetailFailed { .. } => "detail_failed",
            Self::ProxyFailure { .. } => "proxy_failure",
            Self::ProxyBanned { .. } => "proxy_banned",
            Self::UploadResult { .. } => "upload_result",
            Self::RunFinished { .. } => "run_finished",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: RunEvent,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn publish(&self, event: RunEvent) -> EventId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.lock_buffer();
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.lock_buffer();
            for item in buffer.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Return a snapshot of buffered events newer than the supplied identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn backlog_since(&self, since_id: EventId) -> Vec<EventEnvelope> {
        let buffer = self.lock_buffer();
        buffer
            .iter()
            .filter(|item| item.id > since_id)
            .cloned()
            .collect()
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("event buffer mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events either from the replay backlog or from the
/// live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_cover_all_variants() {
        let events = [
            RunEvent::PageFetched { page: 1, ok: true },
            RunEvent::EntrySelected {
                video_code: "ABC-123".into(),
                needed: vec![TorrentType::Subtitle],
            },
            RunEvent::DetailFailed {
                video_code: "ABC-123".into(),
                message: "timeout".into(),
            },
            RunEvent::ProxyFailure {
                proxy_name: "p1".into(),
                kind: FailureKind::Network,
            },
            RunEvent::ProxyBanned {
                proxy_name: "p1".into(),
                expires_at: Utc::now(),
            },
            RunEvent::UploadResult {
                video_code: "ABC-123".into(),
                kind: TorrentType::Subtitle,
                ok: true,
            },
            RunEvent::RunFinished {
                outcome: RunOutcome::Success,
            },
        ];

        let expected = [
            "page_fetched",
            "entry_selected",
            "detail_failed",
            "proxy_failure",
            "proxy_banned",
            "upload_result",
            "run_finished",
        ];

        for (event, kind) in events.iter().zip(expected) {
            assert_eq!(event.kind(), kind);
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events_in_order() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(None);
        bus.publish(RunEvent::PageFetched { page: 1, ok: true });
        bus.publish(RunEvent::PageFetched { page: 2, ok: true });

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn replay_backlog_respects_since_id() {
        let bus = EventBus::new();
        bus.publish(RunEvent::PageFetched { page: 1, ok: true });
        let second = bus.publish(RunEvent::PageFetched { page: 2, ok: true });
        bus.publish(RunEvent::PageFetched { page: 3, ok: true });

        let backlog = bus.backlog_since(second);
        assert_eq!(backlog.len(), 1);
        assert!(matches!(backlog[0].event, RunEvent::PageFetched { page: 3, .. }));
    }

    #[test]
    fn bus_with_capacity_zero_panics() {
        let result = std::panic::catch_unwind(|| EventBus::with_capacity(0));
        assert!(result.is_err());
    }
}
