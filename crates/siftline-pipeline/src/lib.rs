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

//! Pipeline orchestration: sequences the scraper, the uploader, and the
//! deep-storage bridge, classifies the run's outcome, and assembles the
//! resulting `RunStatus` (C8).
//!
//! Layout: `bridge.rs` (the out-of-scope deep-storage collaborator's
//! interface), `orchestrator.rs` (the sequencing and error classification),
//! `summary.rs` (the structured JSON notification body).

mod bridge;
mod orchestrator;
mod summary;

pub use bridge::{BridgeItemStatus, DeepStorageBridge, NullDeepStorageBridge};
pub use orchestrator::{PipelineOrchestrator, PipelineOutcome};
pub use summary::RunSummary;
