//! # Design
//!
//! - Centralize bootstrap-level errors; the pipeline's own `IngestError`
//!   covers everything that happens once a run is under way.
//! - Keep error messages constant while carrying context fields for
//!   debugging.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application bootstrap operations.
pub type AppResult<T> = Result<T, AppError>;

/// Bootstrap-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration failed to load or validate.
    #[error("configuration load failed")]
    Config {
        /// Path the configuration was loaded from.
        path: PathBuf,
        /// Source configuration error.
        #[source]
        source: siftline_config::ConfigError,
    },
    /// The proxy pool failed to construct, usually a ledger read failure.
    #[error("proxy pool construction failed")]
    ProxyPool {
        /// Source ingestion error.
        #[source]
        source: siftline_core::IngestError,
    },
    /// The torrent client failed to construct.
    #[error("torrent client construction failed")]
    TorrentClient {
        /// Source ingestion error.
        #[source]
        source: siftline_core::IngestError,
    },
    /// Logging initialization failed.
    #[error("telemetry initialization failed: {reason}")]
    Telemetry {
        /// Rendered cause, since `init_logging` reports failures via `anyhow::Error`.
        reason: String,
    },
}

impl AppError {
    pub(crate) fn config(path: PathBuf, source: siftline_config::ConfigError) -> Self {
        Self::Config { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_the_attempted_path() {
        let err = AppError::config(
            PathBuf::from("siftline.yaml"),
            siftline_config::ConfigError::Read {
                path: PathBuf::from("siftline.yaml"),
                source: std::io::Error::other("no such file"),
            },
        );
        assert!(matches!(err, AppError::Config { path, .. } if path == PathBuf::from("siftline.yaml")));
    }
}
