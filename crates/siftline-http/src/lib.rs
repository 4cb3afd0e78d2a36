//! HTTP client wrapper: proxy routing, challenge-bypass rewriting, retries,
//! and per-host politeness pacing (C2).
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

mod classify;
mod client;
mod model;
mod pacing;

pub use classify::{classify_response, classify_transport_error};
pub use client::HttpClient;
pub use model::{Classification, Method, RequestSpec, ResponseOutcome};
