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

//! Proxy pool selection and the durable ban ledger (C1/C10).
//!
//! A [`ProxyPool`] is built once per run from [`siftline_config::ProxyConfig`]
//! plus whatever bans are still active in the ledger on disk. Callers ask for
//! a proxy via [`ProxyPool::select`], report the outcome back, and the pool
//! handles cooldown placement and ledger persistence internally. Layout:
//! `model.rs` (proxy entries and stats), `ledger.rs` (CSV persistence),
//! `pool.rs` (the pool itself).

mod ledger;
mod model;
mod pool;

pub use model::{ProxyEntry, ProxySelection, ProxyStats};
pub use pool::ProxyPool;
