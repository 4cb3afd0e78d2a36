//! Index page parsing: one catalog page in, partial `Entry` records out
//! (§4.3).

use chrono::Utc;
use scraper::{Html, Selector};
use siftline_core::Entry;

use crate::tags::normalize;

/// Parse a catalog index page into its partial `Entry` records.
///
/// Returns every entry found on the page, filtering is a downstream concern
/// (§4.3). An index page with no matching items (end of pagination, or a
/// malformed response) yields an empty `Vec`, which callers treat as a legal
/// terminal condition rather than an error.
#[must_use]
pub fn parse_index_page(html: &str, page: u32) -> Vec<Entry> {
    let document = Html::parse_document(html);
    let item_selector = selector("div.item");
    let title_selector = selector("a.video-title");
    let score_selector = selector("span.score");
    let comment_selector = selector("span.comment-count");
    let tag_selector = selector("span.tag");

    let now = Utc::now();
    let mut entries = Vec::new();

    for item in document.select(&item_selector) {
        let Some(title_elem) = item.select(&title_selector).next() else {
            tracing::debug!("index item missing title element, skipped");
            continue;
        };
        let Some(href) = title_elem.value().attr("href") else {
            tracing::debug!("index item missing href, skipped");
            continue;
        };
        let Some(video_code) = title_elem.value().attr("data-code") else {
            tracing::debug!(href, "index item missing video code, skipped");
            continue;
        };
        let title = title_elem.text().collect::<String>().trim().to_string();

        let actor = item
            .select(&selector("span.actor"))
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

        let rating = item
            .select(&score_selector)
            .next()
            .and_then(|e| e.text().collect::<String>().trim().parse::<f32>().ok());

        let comment_count = item
            .select(&comment_selector)
            .next()
            .and_then(|e| e.text().collect::<String>().trim().parse::<u32>().ok());

        let tags = item
            .select(&tag_selector)
            .map(|e| normalize(&e.text().collect::<String>()))
            .collect();

        entries.push(Entry {
            video_code: video_code.to_string(),
            href: href.to_string(),
            title,
            page,
            actor,
            rating,
            comment_count,
            tags,
            create_date: now,
            update_date: now,
        });
    }

    entries
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|_| panic!("invalid built-in selector: {css}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="item">
            <a class="video-title" href="/detail/abc-123" data-code="ABC-123">Example Title</a>
            <span class="actor">Jane Doe</span>
            <span class="score">4.5</span>
            <span class="comment-count">92</span>
            <span class="tag">中字</span>
            <span class="tag">released today</span>
          </div>
          <div class="item">
            <a class="video-title" href="/detail/xyz-789" data-code="XYZ-789">Second Title</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn parses_full_and_partial_entries() {
        let entries = parse_index_page(PAGE, 3);
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.video_code, "ABC-123");
        assert_eq!(first.href, "/detail/abc-123");
        assert_eq!(first.page, 3);
        assert_eq!(first.actor.as_deref(), Some("Jane Doe"));
        assert_eq!(first.rating, Some(4.5));
        assert_eq!(first.comment_count, Some(92));
        assert!(first.tags.contains("chinese_subtitle_magnet"));
        assert!(first.tags.contains("released_recently"));

        let second = &entries[1];
        assert_eq!(second.video_code, "XYZ-789");
        assert!(second.actor.is_none());
        assert!(second.rating.is_none());
        assert!(second.comment_count.is_none());
        assert!(second.tags.is_empty());
    }

    #[test]
    fn empty_page_is_a_legal_terminal_condition() {
        assert!(parse_index_page("<html><body></body></html>", 99).is_empty());
    }

    #[test]
    fn item_missing_required_attributes_is_skipped() {
        let html = r#"<div class="item"><a class="video-title">No href or code</a></div>"#;
        assert!(parse_index_page(html, 1).is_empty());
    }
}
