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

//! Command-line entry point: argument parsing, config loading, and service
//! bootstrap for a single pipeline run.
//!
//! Layout: `cli.rs` (flags), `bootstrap.rs` (collaborator wiring and the run
//! itself), `error.rs` (bootstrap-level error type).

/// Service bootstrap: turns a parsed `Cli` into a completed run.
pub mod bootstrap;
/// Command-line flags and their resolution against loaded configuration.
pub mod cli;
/// Bootstrap-level error type.
pub mod error;

pub use bootstrap::{exit_code, run};
pub use cli::Cli;
pub use error::{AppError, AppResult};
