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

//! Domain types and error taxonomy shared across the siftline workspace.
//!
//! This crate has no IO and no async: it is the vocabulary every other
//! crate in the pipeline (proxy, http, parser, classify, history, scraper,
//! uploader, pipeline) speaks in common.

mod error;
mod model;

pub use error::{IngestError, IngestResult};
pub use model::{
    BanRecord, Entry, FailureKind, HistoryRecord, Magnet, Phase, ReportRow, RunCounts, RunMode,
    RunOutcome, RunStatus, TorrentType, DOWNLOADED_MARKER, MAGNET_SCHEME_PREFIX,
};
