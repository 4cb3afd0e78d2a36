//! Request/response types for the HTTP client (§4.2).

use std::time::Duration;

use siftline_config::ProxyModule;
use siftline_core::FailureKind;

/// HTTP method a request may use. The pipeline never needs more than these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
}

/// One outbound request, fully describing everything the client needs.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL (before any challenge-bypass rewrite).
    pub url: String,
    /// Extra headers merged on top of the browser-like default set.
    pub headers: Vec<(String, String)>,
    /// Request body, for `POST`. Form-encoded or raw, at the caller's choice.
    pub body: Option<Vec<u8>>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Subsystem tag, used to decide proxy routing and politeness pacing.
    pub module: ProxyModule,
    /// Minimum time to wait since the last request to this host.
    pub min_interval: Duration,
}

impl RequestSpec {
    /// Construct a `GET` request with the workspace's default timeout and no
    /// extra headers or politeness pacing.
    #[must_use]
    pub fn get(url: impl Into<String>, module: ProxyModule) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: Duration::from_secs(30),
            module,
            min_interval: Duration::ZERO,
        }
    }

    /// Set the minimum per-host pacing interval.
    #[must_use]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append one header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Build a `POST` request carrying `body`.
    #[must_use]
    pub fn post(url: impl Into<String>, module: ProxyModule, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
            timeout: Duration::from_secs(30),
            module,
            min_interval: Duration::ZERO,
        }
    }
}

/// Outcome classification for a completed or failed attempt (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx/3xx, successfully resolved.
    Ok,
    /// 5xx or 429: retried, not a ban signal.
    Transient,
    /// Sustained 403, login/age-gate redirect loop, or an unsolved
    /// challenge page.
    Ban,
    /// Connect/DNS/reset/timeout.
    Network,
    /// Expired session or rejected credentials.
    Auth,
}

impl Classification {
    /// The `FailureKind` this classification reports to the proxy pool, or
    /// `None` when the request should instead be reported as a success.
    #[must_use]
    pub const fn failure_kind(self) -> Option<FailureKind> {
        match self {
            Self::Ok => None,
            Self::Transient => Some(FailureKind::TransientHttp),
            Self::Ban => Some(FailureKind::Ban),
            Self::Network => Some(FailureKind::Network),
            Self::Auth => Some(FailureKind::Auth),
        }
    }

    /// Whether the client's retry policy applies to this classification.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::Network)
    }
}

/// A completed attempt, successful or not.
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    /// HTTP status code (0 for a transport-level failure with no response).
    pub status: u16,
    /// The URL the response was ultimately served from, after redirects.
    pub final_url: String,
    /// Response headers, lower-cased names.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// This attempt's classification.
    pub classification: Classification,
}
