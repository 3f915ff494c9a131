//! Link extraction from free-form response bodies.
//!
//! Pure functions so response-format drift can be tested without a network.

use std::sync::LazyLock;

use regex::Regex;

static ARCHIVE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://archive\.vn/(?:wip/)?([A-Za-z0-9]+)").expect("archive pattern is valid")
});

/// Site pages that match the archive pattern but are not snapshots.
const ARCHIVE_SITE_PAGES: &[&str] = &["submit", "faq", "search", "timegate", "timemap"];

/// Characters that end a link embedded in text, JSON or HTML.
fn is_link_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '`')
}

/// Find the first link starting with `prefix` in `body`.
///
/// The link must carry something after the prefix; a bare prefix is ignored.
pub fn extract_paste_link(body: &str, prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        return None;
    }

    body.match_indices(prefix).find_map(|(start, _)| {
        let rest = &body[start..];
        let end = rest.find(is_link_terminator).unwrap_or(rest.len());
        let link = rest[..end].trim();
        (link.len() > prefix.len()).then(|| link.to_string())
    })
}

/// Find the first archive snapshot link in `body`.
pub fn extract_archive_link(body: &str) -> Option<String> {
    ARCHIVE_LINK
        .captures_iter(body)
        .find(|caps| !ARCHIVE_SITE_PAGES.contains(&caps[1].to_ascii_lowercase().as_str()))
        .map(|caps| caps[0].trim().to_string())
}

/// First `max_chars` characters of a body, for error reports.
pub fn snippet(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
