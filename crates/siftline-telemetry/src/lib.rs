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

//! Logging initialisation and log-excerpt capture shared by the siftline crates.
//!
//! Layout: `init.rs` (subscriber setup), `log_stream.rs` (broadcasts formatted
//! log lines), `log_excerpts.rs` (bounded ring the orchestrator drains into a
//! run status's log excerpts).

pub mod error;
pub mod init;
pub mod log_excerpts;
pub mod log_stream;

pub use error::{Result as TelemetryResult, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_config};
pub use log_excerpts::LogExcerptCollector;
pub use log_stream::log_stream_receiver;
