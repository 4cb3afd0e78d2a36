//! Magnet classification: bucket assignment and per-bucket preferred-magnet
//! selection (C4).
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

use std::collections::BTreeMap;

use siftline_core::{Magnet, TorrentType};

/// Crack-variant priority, used only as a tie-break among magnets that
/// already share a `hacked_*` bucket. Declaration order is priority order:
/// `UncutCrack` is preferred over `Uncut`, which is preferred over
/// `CrackOnly`, which is preferred over the unqualified `Base` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CrackVariant {
    UncutCrack,
    Uncut,
    CrackOnly,
    Base,
}

impl CrackVariant {
    fn detect(haystack: &str) -> Option<Self> {
        if haystack.contains("uncut-crack") {
            Some(Self::UncutCrack)
        } else if haystack.contains("uncut") {
            Some(Self::Uncut)
        } else if haystack.contains("crack-only") {
            Some(Self::CrackOnly)
        } else if haystack.contains("crack") {
            Some(Self::Base)
        } else {
            None
        }
    }
}

fn searchable_text(magnet: &Magnet) -> String {
    let mut text = magnet.name.to_lowercase();
    for tag in &magnet.tags {
        text.push(' ');
        text.push_str(tag);
    }
    text
}

fn has_subtitle_marker(text: &str, magnet: &Magnet) -> bool {
    magnet.has_tag("subtitle") || text.contains("subtitle")
}

fn has_4k_marker(text: &str, magnet: &Magnet) -> bool {
    magnet.has_tag("4k") || text.contains("4k")
}

/// Assign a single magnet to its bucket (§4.4 rule table).
#[must_use]
fn bucket_of(magnet: &Magnet) -> (TorrentType, Option<CrackVariant>) {
    let text = searchable_text(magnet);
    let crack = CrackVariant::detect(&text);
    let subtitle = has_subtitle_marker(&text, magnet);
    match (crack, subtitle) {
        (Some(variant), true) => (TorrentType::HackedSubtitle, Some(variant)),
        (Some(variant), false) => (TorrentType::HackedNoSubtitle, Some(variant)),
        (None, true) => (TorrentType::Subtitle, None),
        (None, false) => (TorrentType::NoSubtitle, None),
    }
}

/// Whether `candidate` should replace `current` as the bucket's preferred
/// magnet: crack-variant priority first (hacked buckets only), then — for
/// `no_subtitle` only — a 4K marker, then larger size, then newer
/// timestamp, then stable input order (the earlier magnet wins any
/// remaining tie).
fn candidate_wins(
    bucket: TorrentType,
    candidate: &Magnet,
    candidate_crack: Option<CrackVariant>,
    current: &Magnet,
    current_crack: Option<CrackVariant>,
) -> bool {
    if let (Some(candidate_variant), Some(current_variant)) = (candidate_crack, current_crack) {
        match candidate_variant.cmp(&current_variant) {
            std::cmp::Ordering::Less => return true,
            std::cmp::Ordering::Greater => return false,
            std::cmp::Ordering::Equal => {}
        }
    }

    if bucket == TorrentType::NoSubtitle {
        let candidate_4k = has_4k_marker(&searchable_text(candidate), candidate);
        let current_4k = has_4k_marker(&searchable_text(current), current);
        if candidate_4k != current_4k {
            return candidate_4k;
        }
    }

    match candidate.size_bytes.unwrap_or(0).cmp(&current.size_bytes.unwrap_or(0)) {
        std::cmp::Ordering::Less => return false,
        std::cmp::Ordering::Greater => return true,
        std::cmp::Ordering::Equal => {}
    }

    parse_timestamp(&candidate.timestamp_text).cmp(&parse_timestamp(&current.timestamp_text)) == std::cmp::Ordering::Greater
}

/// Best-effort timestamp parse for the newer-wins tie-break. Falls back to
/// lexicographic comparison of the raw text (ISO-like `YYYY-MM-DD` strings
/// order correctly that way) when the known formats don't match.
fn parse_timestamp(text: &str) -> TimestampKey {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(text, format) {
            return TimestampKey::Parsed(parsed);
        }
        if let Ok(parsed) = chrono::NaiveDate::parse_from_str(text, format) {
            return TimestampKey::Parsed(parsed.and_hms_opt(0, 0, 0).expect("midnight is a valid time"));
        }
    }
    TimestampKey::Raw(text.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum TimestampKey {
    Raw(String),
    Parsed(chrono::NaiveDateTime),
}

/// Classify a detail page's magnets into buckets, selecting the single
/// preferred magnet per bucket. Buckets with no matching magnet are absent
/// from the returned map rather than present with an empty value (§4.4).
#[must_use]
pub fn classify(magnets: Vec<Magnet>) -> BTreeMap<TorrentType, Magnet> {
    let mut best: BTreeMap<TorrentType, (Magnet, Option<CrackVariant>)> = BTreeMap::new();

    for magnet in magnets {
        let (bucket, crack) = bucket_of(&magnet);
        match best.get(&bucket) {
            None => {
                best.insert(bucket, (magnet, crack));
            }
            Some((current, current_crack)) => {
                if candidate_wins(bucket, &magnet, crack, current, *current_crack) {
                    best.insert(bucket, (magnet, crack));
                }
            }
        }
    }

    best.into_iter().map(|(bucket, (magnet, _))| (bucket, magnet)).collect()
}
