//! Ring buffer capturing recent log lines for embedding in a `RunStatus`'s
//! `log_excerpts` (§3, §7): no silent failures, so every run status carries
//! enough recent log context to act on without re-reading files.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::error;

use crate::log_stream::log_stream_receiver;

const DEFAULT_CAPACITY: usize = 200;

/// Drains the shared log stream into a bounded ring, oldest line evicted
/// first once `capacity` is reached.
pub struct LogExcerptCollector {
    buffer: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogExcerptCollector {
    /// Spawn a collector with the default ring capacity.
    #[must_use]
    pub fn spawn() -> (Arc<Self>, JoinHandle<()>) {
        Self::spawn_with_capacity(DEFAULT_CAPACITY)
    }

    /// Spawn a collector with an explicit ring capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn spawn_with_capacity(capacity: usize) -> (Arc<Self>, JoinHandle<()>) {
        assert!(capacity > 0, "log excerpt ring capacity must be positive");
        let collector = Arc::new(Self { buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))), capacity });
        let worker = Arc::clone(&collector);
        let handle = tokio::spawn(async move {
            let mut receiver = log_stream_receiver();
            loop {
                match receiver.recv().await {
                    Ok(line) => worker.push(line),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
        (collector, handle)
    }

    fn push(&self, line: String) {
        let mut buffer = self.lock_buffer();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(line);
    }

    /// Snapshot of the currently buffered lines, oldest first.
    ///
    /// # Panics
    /// Panics if the ring's mutex has been poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.lock_buffer().iter().cloned().collect()
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<String>> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("log excerpt ring mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector_with_capacity(capacity: usize) -> LogExcerptCollector {
        LogExcerptCollector { buffer: Arc::new(Mutex::new(VecDeque::new())), capacity }
    }

    #[test]
    fn push_evicts_oldest_once_capacity_reached() {
        let collector = collector_with_capacity(2);
        collector.push("a".into());
        collector.push("b".into());
        collector.push("c".into());
        assert_eq!(collector.snapshot(), vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn spawn_returns_an_empty_collector() {
        let (collector, _handle) = LogExcerptCollector::spawn();
        assert!(collector.snapshot().is_empty());
    }

    #[test]
    fn spawn_with_capacity_zero_panics() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            rt.block_on(async { LogExcerptCollector::spawn_with_capacity(0) });
        }));
        assert!(result.is_err());
    }
}
