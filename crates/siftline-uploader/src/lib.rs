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

//! Report reader/rewriter and torrent-client trait plus HTTP implementation
//! (C7, C9 reader/annotator half).
//!
//! [`UploaderEngine`] drives the algorithm; [`TorrentClient`] is the
//! abstract client contract it depends on, with [`HttpTorrentClient`] as the
//! Web-UI-backed implementation.

mod client;
mod engine;
mod http_client;
mod report_io;

pub use client::{AddOutcome, TorrentClient, TorrentHandle};
pub use engine::UploaderEngine;
pub use http_client::HttpTorrentClient;
pub use report_io::{read_rows, write_rows_atomic};
