//! Detail page parsing: magnets plus any `Entry` attributes the index page
//! omitted (§4.3).

use scraper::{Html, Selector};
use siftline_core::Magnet;

use crate::tags::normalize;

/// Attributes a detail page may carry that the index page didn't.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailExtras {
    /// Actor/performer name, when absent from the index listing.
    pub actor: Option<String>,
    /// Rating, when absent from the index listing.
    pub rating: Option<f32>,
    /// Comment count, when absent from the index listing.
    pub comment_count: Option<u32>,
}

/// Parse a detail page into its magnets and any supplemental entry fields.
///
/// Magnets whose href does not begin with the magnet scheme prefix are
/// silently skipped rather than failing the whole page: a detail page with
/// zero valid magnets is a legal (if unhelpful) result, left to the caller
/// to decide what to do with.
#[must_use]
pub fn parse_detail_page(html: &str) -> (Vec<Magnet>, DetailExtras) {
    let document = Html::parse_document(html);
    let row_selector = selector("div.magnet-row");
    let link_selector = selector("a.magnet-link");
    let tag_selector = selector("span.magnet-tag");
    let size_selector = selector("span.magnet-size");
    let date_selector = selector("span.magnet-date");

    let mut magnets = Vec::new();
    for row in document.select(&row_selector) {
        let Some(link) = row.select(&link_selector).next() else {
            continue;
        };
        let Some(uri) = link.value().attr("href") else {
            continue;
        };
        let name = link.text().collect::<String>().trim().to_string();
        let tags: Vec<String> = row.select(&tag_selector).map(|e| normalize(&e.text().collect::<String>())).collect();
        let size_text = row
            .select(&size_selector)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let timestamp_text = row
            .select(&date_selector)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let size_bytes = parse_size(&size_text);

        match Magnet::new(uri, name, tags, size_bytes, size_text, timestamp_text) {
            Ok(magnet) => magnets.push(magnet),
            Err(rejected_uri) => tracing::debug!(uri = %rejected_uri, "magnet row has non-magnet href, skipped"),
        }
    }

    let extras = DetailExtras {
        actor: text_of(&document, "span.actor"),
        rating: text_of(&document, "span.score").and_then(|s| s.parse().ok()),
        comment_count: text_of(&document, "span.comment-count").and_then(|s| s.parse().ok()),
    };

    (magnets, extras)
}

fn text_of(document: &Html, css: &str) -> Option<String> {
    document
        .select(&selector(css))
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|_| panic!("invalid built-in selector: {css}"))
}

/// Parse a human-readable size string (`"1.5 GB"`, `"512MB"`) into bytes.
/// Returns `None` for text that carries no recognizable unit.
fn parse_size(text: &str) -> Option<u64> {
    let clean = text.trim().to_uppercase();
    if clean.is_empty() {
        return None;
    }
    let split_at = clean.find(|c: char| c.is_ascii_alphabetic())?;
    let (num_str, unit) = clean.split_at(split_at);
    let num: f64 = num_str.trim().parse().ok()?;
    let multiplier: u64 = match unit.trim() {
        "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        "TB" => 1024 * 1024 * 1024 * 1024,
        _ => return None,
    };
    Some((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <span class="actor">Jane Doe</span>
          <span class="score">4.8</span>
          <span class="comment-count">120</span>
          <div class="magnet-row">
            <a class="magnet-link" href="magnet:?xt=urn:btih:abc">release.name.uncensored</a>
            <span class="magnet-tag">Subtitle</span>
            <span class="magnet-size">1.5 GB</span>
            <span class="magnet-date">2024-01-01</span>
          </div>
          <div class="magnet-row">
            <a class="magnet-link" href="not-a-magnet">bad row</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn parses_magnets_and_extras() {
        let (magnets, extras) = parse_detail_page(PAGE);
        assert_eq!(magnets.len(), 1);
        assert_eq!(magnets[0].uri, "magnet:?xt=urn:btih:abc");
        assert!(magnets[0].has_tag("subtitle"));
        assert_eq!(magnets[0].size_bytes, Some(1_610_612_736));
        assert_eq!(extras.actor.as_deref(), Some("Jane Doe"));
        assert_eq!(extras.rating, Some(4.8));
        assert_eq!(extras.comment_count, Some(120));
    }

    #[test]
    fn invalid_magnet_href_is_skipped() {
        let html = r#"<div class="magnet-row"><a class="magnet-link" href="not-a-magnet">x</a></div>"#;
        let (magnets, _) = parse_detail_page(html);
        assert!(magnets.is_empty());
    }

    #[test]
    fn size_parsing_rejects_unrecognized_units() {
        assert_eq!(parse_size("7 widgets"), None);
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("512MB"), Some(536_870_912));
    }
}
