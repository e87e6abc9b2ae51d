use once_cell::sync::Lazy;
use regex::Regex;

// NewsAPI truncates bodies and appends a "[+1234 chars]" marker.
static TRUNCATION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[\+\d+\s*chars\]").expect("valid truncation regex"));
static ADJACENT_EMPTY_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*></[^>]*>").expect("valid empty tag regex"));
static BLANK_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>\s*</[^>]*>").expect("valid blank tag regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static EMPTY_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<ul>\s*<li>\s*</li>\s*</ul>").expect("valid empty list regex"));

/// Plain-text article body: truncation markers, empty elements and all
/// remaining tags removed, whitespace collapsed.
pub fn clean_news_content(content: Option<&str>) -> String {
    let Some(content) = content.filter(|c| !c.is_empty()) else {
        return String::new();
    };

    let cleaned = TRUNCATION_MARKER.replace_all(content, "");
    let cleaned = ADJACENT_EMPTY_TAGS.replace_all(&cleaned, "");
    let cleaned = BLANK_TAGS.replace_all(&cleaned, "");
    let cleaned = ANY_TAG.replace_all(&cleaned, "");
    let cleaned = WHITESPACE_RUN.replace_all(&cleaned, " ");

    cleaned.trim().to_string()
}

/// HTML article body with truncation markers and empty lists removed.
/// Other markup is left alone.
pub fn clean_news_html(content: Option<&str>) -> String {
    let Some(content) = content.filter(|c| !c.is_empty()) else {
        return String::new();
    };

    let cleaned = TRUNCATION_MARKER.replace_all(content, "");
    EMPTY_LIST.replace_all(&cleaned, "").into_owned()
}
