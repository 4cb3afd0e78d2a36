//! HTML page parsing, multilingual tag recognition, and quality filters
//! (C3).
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

mod detail;
mod filter;
mod index;
pub mod tags;

pub use detail::{parse_detail_page, DetailExtras};
pub use filter::{phase_1_admits, phase_2_admits, FilterOverrides};
pub use index::parse_index_page;
