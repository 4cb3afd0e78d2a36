//! CSV-backed history store keyed by entry `href`, with legacy-schema
//! migration (C5).
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

mod row;
mod store;

pub use store::{HistoryOverrides, HistoryStore};
