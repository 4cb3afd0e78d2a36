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

//! Static, typed configuration for the ingestion pipeline.
//!
//! The whole document is loaded once from a YAML file at process startup
//! (with a narrow set of credential fields overridable via environment
//! variables) and treated as immutable for the lifetime of the run. Layout:
//! `model.rs` (the document itself), `loader.rs` (read + override + validate),
//! `validate.rs` (cross-field invariants), `defaults.rs` (fallback values),
//! `error.rs` (failure modes).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::load;
pub use model::{
    BypassConfig, Config, DeepStorageConfig, HistoryConfig, ProxyConfig, ProxyMode, ProxyModule,
    ScraperConfig, TorrentClientConfig,
};
