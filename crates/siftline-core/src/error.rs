//! Error taxonomy shared across the ingestion pipeline (spec §7).
//!
//! Fallible operations return explicit `Result` values carrying one of these
//! kinds rather than relying on exceptions bubbling through layers. Only
//! [`IngestError::Io`] and [`IngestError::LogicGuard`] are expected to abort
//! the process; every other kind is recovered or classified by its caller.

use thiserror::Error;

use crate::model::FailureKind;

/// Unified error type for the ingestion core.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Connect, DNS, reset, or timeout. Retried by the HTTP client.
    #[error("network error: {message}")]
    Network {
        /// Human-readable description.
        message: String,
    },

    /// 5xx or 429 response. Retried by the HTTP client.
    #[error("transient HTTP error (status {status}): {message}")]
    TransientHttp {
        /// HTTP status code observed.
        status: u16,
        /// Human-readable description.
        message: String,
    },

    /// Sustained 403, unsolvable challenge, or forced age-gate loop.
    #[error("proxy banned: {message}")]
    Ban {
        /// Human-readable description.
        message: String,
    },

    /// Expired session cookie on the catalog, or bad credentials downstream.
    #[error("authentication failed: {message}")]
    Auth {
        /// Human-readable description.
        message: String,
    },

    /// Expected structure missing from a parsed document. Recovered by
    /// skipping the affected entry.
    #[error("parse error: {message}")]
    Parse {
        /// Human-readable description.
        message: String,
    },

    /// No proxy available to serve the request (pool exhausted by bans).
    #[error("no proxy available")]
    NoProxyAvailable,

    /// An invariant was violated; indicates a bug, not a recoverable fault.
    #[error("logic guard violated: {message}")]
    LogicGuard {
        /// Description of the violated invariant.
        message: String,
    },

    /// Local storage failure writing a report, history, or ledger file.
    #[error("storage error: {message}")]
    Io {
        /// Human-readable description.
        message: String,
        /// Underlying IO error, when available.
        #[source]
        source: Option<std::io::Error>,
    },
}

impl IngestError {
    /// Classify this error into the [`FailureKind`] the proxy pool expects
    /// from `report_failure`, when applicable.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Network { .. } => Some(FailureKind::Network),
            Self::TransientHttp { .. } => Some(FailureKind::TransientHttp),
            Self::Ban { .. } => Some(FailureKind::Ban),
            Self::Auth { .. } => Some(FailureKind::Auth),
            Self::Parse { .. } | Self::NoProxyAvailable | Self::LogicGuard { .. } | Self::Io { .. } => None,
        }
    }

    /// Whether this error must bubble all the way to the orchestrator as a
    /// critical failure (§7 propagation policy).
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Io { .. } | Self::LogicGuard { .. })
    }

    /// Whether this error is recovered locally by retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::TransientHttp { .. })
    }

    /// Construct an [`IngestError::Io`] from an underlying [`std::io::Error`].
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }
}

/// Convenience alias for ingestion results.
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_io_are_critical() {
        assert!(IngestError::Auth { message: "x".into() }.is_critical());
        assert!(IngestError::io("x", std::io::Error::other("boom")).is_critical());
        assert!(!IngestError::Parse { message: "x".into() }.is_critical());
    }

    #[test]
    fn ban_classifies_as_ban_failure_kind() {
        let err = IngestError::Ban { message: "403".into() };
        assert_eq!(err.failure_kind(), Some(FailureKind::Ban));
    }

    #[test]
    fn network_and_transient_are_retryable() {
        assert!(IngestError::Network { message: "x".into() }.is_retryable());
        assert!(
            IngestError::TransientHttp {
                status: 503,
                message: "x".into()
            }
            .is_retryable()
        );
        assert!(!IngestError::Ban { message: "x".into() }.is_retryable());
    }
}
