//! Submission client configuration.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// A remote endpoint plus an optional proxy prefix used when the direct
/// request cannot be made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Direct endpoint URL
    pub url: String,
    /// Prefix prepended to `url` for the proxied fallback (e.g. `https://corsproxy.io/?`)
    pub proxy_prefix: Option<String>,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            proxy_prefix: None,
        }
    }

    pub fn with_proxy(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.proxy_prefix = (!prefix.trim().is_empty()).then_some(prefix);
        self
    }

    /// The proxy-wrapped form of the endpoint, if a proxy is configured.
    pub fn proxied_url(&self) -> Option<String> {
        self.proxy_prefix
            .as_ref()
            .map(|prefix| format!("{}{}", prefix, self.url))
    }
}

/// Paste service settings.
#[derive(Debug, Clone)]
pub struct PasteConfig {
    pub endpoint: EndpointConfig,
    /// Literal prefix every returned paste link starts with
    pub link_prefix: String,
    /// Syntax highlighting hint sent with the paste
    pub syntax: String,
    /// Expiry hint in days
    pub expiry_days: u32,
}

/// Submission client configuration.
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    pub paste: PasteConfig,
    pub archive: EndpointConfig,
    /// Per-request timeout
    pub timeout: Duration,
    /// Rate-limit retry policy, shared by both kinds
    pub retry: RetryPolicy,
    pub user_agent: String,
}

const DEFAULT_PROXY: &str = "https://corsproxy.io/?";

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            paste: PasteConfig {
                endpoint: EndpointConfig::new("https://dpaste.org/api/").with_proxy(DEFAULT_PROXY),
                link_prefix: "https://dpaste.org/".to_string(),
                syntax: "plaintext".to_string(),
                expiry_days: 7,
            },
            archive: EndpointConfig::new("https://archive.vn/submit/").with_proxy(DEFAULT_PROXY),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            user_agent: format!("tkit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SubmitConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let proxy = std::env::var("TKIT_CORS_PROXY").unwrap_or_else(|_| DEFAULT_PROXY.to_string());

        Self {
            paste: PasteConfig {
                endpoint: EndpointConfig::new(
                    std::env::var("TKIT_PASTE_URL").unwrap_or(defaults.paste.endpoint.url),
                )
                .with_proxy(proxy.clone()),
                link_prefix: std::env::var("TKIT_PASTE_LINK_PREFIX")
                    .unwrap_or(defaults.paste.link_prefix),
                syntax: std::env::var("TKIT_PASTE_SYNTAX").unwrap_or(defaults.paste.syntax),
                expiry_days: std::env::var("TKIT_PASTE_EXPIRY_DAYS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.paste.expiry_days),
            },
            archive: EndpointConfig::new(
                std::env::var("TKIT_ARCHIVE_URL").unwrap_or(defaults.archive.url),
            )
            .with_proxy(proxy),
            timeout: Duration::from_secs(
                std::env::var("TKIT_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            retry: RetryPolicy {
                max_retries: std::env::var("TKIT_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retry.max_retries),
                base_delay: Duration::from_millis(
                    std::env::var("TKIT_BACKOFF_BASE_MS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(2000),
                ),
            },
            user_agent: defaults.user_agent,
        }
    }

    /// Point both endpoints at `base_url` without proxies.
    pub fn for_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let mut config = Self::default();
        config.paste.endpoint = EndpointConfig::new(format!("{}/api/", base));
        config.paste.link_prefix = format!("{}/", base);
        config.archive = EndpointConfig::new(format!("{}/submit/", base));
        config
    }
}
