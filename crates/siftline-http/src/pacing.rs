//! Per-host politeness pacing: a token-bucket-like minimum inter-request
//! interval, not a retry mechanism (§4.2).

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use governor::{Quota, RateLimiter};

type HostLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Enforces a minimum delay between requests to the same host, independent
/// of retry backoff.
#[derive(Default)]
pub(crate) struct PoliteLimiter {
    limiters: Mutex<HashMap<String, Arc<HostLimiter>>>,
}

impl PoliteLimiter {
    /// Construct an empty limiter, one bucket created lazily per host.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until at least `min_interval` has passed since the last
    /// request to `host`. A zero interval never blocks and allocates no
    /// bucket.
    pub(crate) async fn wait(&self, host: &str, min_interval: Duration) {
        if min_interval.is_zero() {
            return;
        }
        let limiter = self.limiter_for(host, min_interval);
        limiter.until_ready().await;
    }

    fn limiter_for(&self, host: &str, min_interval: Duration) -> Arc<HostLimiter> {
        let mut limiters = self.limiters.lock().expect("pacing mutex poisoned");
        limiters
            .entry(host.to_string())
            .or_insert_with(|| {
                let quota = Quota::with_period(min_interval)
                    .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(1).expect("1 is nonzero")));
                Arc::new(RateLimiter::direct(quota))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_interval_never_blocks() {
        let limiter = PoliteLimiter::new();
        limiter.wait("example.com", Duration::ZERO).await;
        limiter.wait("example.com", Duration::ZERO).await;
    }

    #[tokio::test]
    async fn first_request_to_a_host_is_immediate() {
        let limiter = PoliteLimiter::new();
        limiter.wait("example.com", Duration::from_millis(50)).await;
    }

    #[test]
    fn separate_hosts_get_separate_buckets() {
        let limiter = PoliteLimiter::new();
        let a = limiter.limiter_for("a.example", Duration::from_secs(1));
        let b = limiter.limiter_for("b.example", Duration::from_secs(1));
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
