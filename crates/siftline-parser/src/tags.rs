//! Multilingual tag-set recognition (§4.3).
//!
//! The site renders the same two semantic markers in several languages and
//! scripts. Rather than chase every HTML variant, recognition works on the
//! already-extracted tag/title text: a small table maps known raw strings to
//! one of the two canonical tags the rest of the pipeline reasons about.

/// Canonical tag meaning "this entry has a magnet link with Chinese
/// subtitles" (tag set (i) in §4.3).
pub const CHINESE_SUBTITLE: &str = "chinese_subtitle_magnet";

/// Canonical tag meaning "this entry was released today or yesterday" (tag
/// set (ii) in §4.3).
pub const RECENT_RELEASE: &str = "released_recently";

const CHINESE_SUBTITLE_VARIANTS: [&str; 5] = ["中字", "含中字磁力", "中文字幕", "chinese subtitle", "zh-sub"];
const RECENT_RELEASE_VARIANTS: [&str; 4] = ["今日新種", "本日発売", "released today", "released yesterday"];

/// Normalize a raw tag string as read from the page into its canonical form,
/// lowercasing and folding known multilingual variants of the two
/// recognized tag sets. Tags with no known variant mapping pass through
/// lowercased and trimmed, unchanged otherwise.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if CHINESE_SUBTITLE_VARIANTS.iter().any(|variant| trimmed.eq_ignore_ascii_case(variant)) {
        return CHINESE_SUBTITLE.to_string();
    }
    if RECENT_RELEASE_VARIANTS.iter().any(|variant| trimmed.eq_ignore_ascii_case(variant)) {
        return RECENT_RELEASE.to_string();
    }
    trimmed.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_chinese_subtitle_variants() {
        assert_eq!(normalize("中字"), CHINESE_SUBTITLE);
        assert_eq!(normalize("Chinese Subtitle"), CHINESE_SUBTITLE);
    }

    #[test]
    fn recognizes_recent_release_variants() {
        assert_eq!(normalize("released today"), RECENT_RELEASE);
        assert_eq!(normalize("本日発売"), RECENT_RELEASE);
    }

    #[test]
    fn unknown_tag_passes_through_lowercased() {
        assert_eq!(normalize("  Uncensored  "), "uncensored");
    }
}
