//! Social-post URL validation for archive submissions.
//!
//! Only status links on a fixed set of hosts are accepted:
//! `http(s)://[www.]twitter.com/<handle>/status/<id>` and the same on `x.com`.
//! Anything after the numeric status id (photo paths, tracking query strings)
//! is tolerated and kept in the normalized URL.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Hosts whose status links may be archived.
pub const ALLOWED_HOSTS: &[&str] = &["twitter.com", "www.twitter.com", "x.com", "www.x.com"];

/// Maximum accepted URL length.
const MAX_URL_LENGTH: usize = 2048;

static STATUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?(?:twitter\.com|x\.com)/([^/?#]+)/status/(\d+)")
        .expect("status pattern is valid")
});

/// Reasons a URL is not an archivable social post.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocialUrlError {
    #[error("URL is empty")]
    Empty,

    #[error("URL exceeds {MAX_URL_LENGTH} characters")]
    TooLong,

    #[error("not a valid URL: {0}")]
    Malformed(String),

    #[error("host is not a supported social network: {0}")]
    UnsupportedHost(String),

    #[error("URL does not point to a post status")]
    NotAStatus,
}

/// A validated social-post URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPostUrl {
    /// Trimmed URL as submitted
    pub url: String,
    /// Lowercased host
    pub host: String,
    /// Account handle
    pub handle: String,
    /// Numeric status id
    pub status_id: String,
}

/// Validate a user-supplied social-post URL.
pub fn validate_social_post_url(raw: &str) -> Result<SocialPostUrl, SocialUrlError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(SocialUrlError::Empty);
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(SocialUrlError::TooLong);
    }

    let parsed = Url::parse(trimmed).map_err(|e| SocialUrlError::Malformed(e.to_string()))?;
    let host = parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| SocialUrlError::Malformed("missing host".to_string()))?;

    if !ALLOWED_HOSTS.contains(&host.as_str()) {
        return Err(SocialUrlError::UnsupportedHost(host));
    }
    // The URL is sent as typed, so the typed authority must be the bare host.
    // The parser drops default ports, so check the raw text as well.
    if parsed.port().is_some() || raw_authority(trimmed).contains([':', '@']) {
        return Err(SocialUrlError::Malformed(
            "port or credentials in host".to_string(),
        ));
    }

    // Scheme and host arrive normalized from the parser; the path is matched as typed.
    let candidate = format!("{}://{}{}", parsed.scheme(), host, parsed.path());

    let captures = STATUS_PATTERN
        .captures(&candidate)
        .ok_or(SocialUrlError::NotAStatus)?;

    Ok(SocialPostUrl {
        url: trimmed.to_string(),
        host,
        handle: captures[1].to_string(),
        status_id: captures[2].to_string(),
    })
}

/// Authority section of a URL as typed, between `://` and the path.
fn raw_authority(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_status_links() {
        let post = validate_social_post_url("https://x.com/user/status/12345").unwrap();
        assert_eq!(post.host, "x.com");
        assert_eq!(post.handle, "user");
        assert_eq!(post.status_id, "12345");

        assert!(validate_social_post_url("https://twitter.com/rustlang/status/1790000000000000000").is_ok());
        assert!(validate_social_post_url("http://www.twitter.com/a_b/status/1?s=20").is_ok());
        assert!(validate_social_post_url("https://www.x.com/user/status/42/photo/1").is_ok());
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        let post = validate_social_post_url("  https://x.com/user/status/7 \n").unwrap();
        assert_eq!(post.url, "https://x.com/user/status/7");
    }

    #[test]
    fn test_uppercase_host() {
        let post = validate_social_post_url("https://X.COM/user/status/9").unwrap();
        assert_eq!(post.host, "x.com");
    }

    #[test]
    fn test_rejects_other_urls() {
        assert_eq!(
            validate_social_post_url("https://example.com/post/1"),
            Err(SocialUrlError::UnsupportedHost("example.com".to_string()))
        );
        assert!(matches!(
            validate_social_post_url("not-a-url"),
            Err(SocialUrlError::Malformed(_))
        ));
        assert_eq!(validate_social_post_url("   "), Err(SocialUrlError::Empty));
        assert_eq!(
            validate_social_post_url("https://x.com/user"),
            Err(SocialUrlError::NotAStatus)
        );
        assert_eq!(
            validate_social_post_url("https://x.com/user/status/abc"),
            Err(SocialUrlError::NotAStatus)
        );
        assert!(validate_social_post_url("https://x.com.evil.example/user/status/1").is_err());
        assert!(validate_social_post_url("ftp://x.com/user/status/1").is_err());
    }

    #[test]
    fn test_rejects_explicit_port_and_credentials() {
        for url in [
            "https://x.com:8443/u/status/1",
            "https://x.com:443/u/status/1",
            "https://user@x.com/u/status/1",
        ] {
            assert!(
                matches!(validate_social_post_url(url), Err(SocialUrlError::Malformed(_))),
                "{url}"
            );
        }
        assert_eq!(raw_authority("https://x.com/u/status/1?s=1"), "x.com");
    }

    #[test]
    fn test_rejects_oversized_url() {
        let url = format!("https://x.com/user/status/{}", "1".repeat(MAX_URL_LENGTH));
        assert_eq!(validate_social_post_url(&url), Err(SocialUrlError::TooLong));
    }
}
