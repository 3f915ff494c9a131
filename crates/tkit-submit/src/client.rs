//! Submission client for paste and archive services.

use std::sync::Arc;

use metrics::counter;
use reqwest::{Client, StatusCode};
use tkit_models::{validate_social_post_url, SubmissionKind, SubmissionRequest, SubmissionState};
use tracing::{debug, info, warn};

use crate::config::SubmitConfig;
use crate::error::{SubmitError, SubmitResult};
use crate::parse::{extract_archive_link, extract_paste_link, snippet};
use crate::retry::{retry_on_rate_limit, Sleeper, TokioSleeper};
use crate::tracker::{SubmissionTracker, SubmitHooks};
use crate::transport::{post_form, RawResponse};

/// Characters of an unparsable body kept in the error.
const SNIPPET_CHARS: usize = 200;

/// Publishes text or URLs to third-party services and returns their links.
///
/// No idempotency key is sent. A transport failure after the remote accepted
/// the content is reported, not retried, so duplicates are only possible
/// when the caller resubmits.
pub struct SubmissionClient {
    http: Client,
    config: SubmitConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl SubmissionClient {
    /// Create a new submission client.
    pub fn new(config: SubmitConfig) -> SubmitResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SubmitError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> SubmitResult<Self> {
        Self::new(SubmitConfig::from_env())
    }

    /// Replace the backoff sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &SubmitConfig {
        &self.config
    }

    /// Publish text to the paste service.
    pub async fn paste(&self, text: &str) -> SubmitResult<String> {
        self.submit(SubmissionKind::Paste, text).await
    }

    /// Submit a social-post URL to the archive service.
    pub async fn archive(&self, url: &str) -> SubmitResult<String> {
        self.submit(SubmissionKind::Archive, url).await
    }

    /// Submit `payload` and return the canonical link.
    pub async fn submit(&self, kind: SubmissionKind, payload: &str) -> SubmitResult<String> {
        self.submit_with(kind, payload, SubmitHooks::default()).await
    }

    /// Submit with cancellation and state observation.
    pub async fn submit_with(
        &self,
        kind: SubmissionKind,
        payload: &str,
        hooks: SubmitHooks,
    ) -> SubmitResult<String> {
        let mut tracker = SubmissionTracker::new(kind, hooks);
        let result = self.drive(kind, payload, &mut tracker).await;

        match &result {
            Ok(link) => {
                tracker.transition(SubmissionState::Succeeded);
                info!(kind = %kind, link = %link, "Submission succeeded");
                counter!("tkit_submissions_total", "kind" => kind.as_str(), "outcome" => "succeeded")
                    .increment(1);
            }
            Err(e) => {
                tracker.transition(SubmissionState::Failed);
                warn!(kind = %kind, error_kind = e.kind(), "Submission failed: {}", e);
                counter!("tkit_submissions_total", "kind" => kind.as_str(), "outcome" => e.kind())
                    .increment(1);
            }
        }

        result
    }

    async fn drive(
        &self,
        kind: SubmissionKind,
        payload: &str,
        tracker: &mut SubmissionTracker,
    ) -> SubmitResult<String> {
        tracker.transition(SubmissionState::Validating);
        let payload = validate_payload(kind, payload)?;

        let mut request = SubmissionRequest::new(kind, payload.clone())
            .with_max_retries(self.config.retry.max_retries);
        let body = payload.as_str();

        let response = retry_on_rate_limit(
            &self.config.retry,
            self.sleeper.as_ref(),
            &mut request,
            tracker,
            move |attempt| self.send_once(kind, body, attempt),
        )
        .await?;

        tracker.transition(SubmissionState::Parsing);
        self.parse(kind, &response)
    }

    /// One request; rate limits and HTTP errors are classified here.
    async fn send_once(
        &self,
        kind: SubmissionKind,
        payload: &str,
        attempt: u32,
    ) -> SubmitResult<RawResponse> {
        debug!(kind = %kind, attempt, "Submitting");

        let response = match kind {
            SubmissionKind::Paste => {
                let paste = &self.config.paste;
                let expiry = paste.expiry_days.to_string();
                let form = [
                    ("content", payload),
                    ("syntax", paste.syntax.as_str()),
                    ("expiry_days", expiry.as_str()),
                ];
                post_form(&self.http, &paste.endpoint, &form).await?
            }
            SubmissionKind::Archive => {
                let form = [("url", payload)];
                post_form(&self.http, &self.config.archive, &form).await?
            }
        };

        if response.status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SubmitError::RateLimited { attempts: attempt });
        }
        if !response.status.is_success() {
            return Err(SubmitError::transport(
                format!("service answered HTTP {}", response.status),
                Some(response.status.as_u16()),
            ));
        }

        Ok(response)
    }

    fn parse(&self, kind: SubmissionKind, response: &RawResponse) -> SubmitResult<String> {
        let link = match kind {
            SubmissionKind::Paste => extract_paste_link(&response.body, &self.config.paste.link_prefix),
            // Redirects may land directly on the snapshot page.
            SubmissionKind::Archive => extract_archive_link(&response.body)
                .or_else(|| extract_archive_link(&response.final_url)),
        };

        link.map(|l| l.trim().to_string())
            .ok_or_else(|| SubmitError::UnparsableResponse {
                status: response.status.as_u16(),
                snippet: snippet(&response.body, SNIPPET_CHARS),
            })
    }
}

/// Check a payload before any network call; returns what will be sent.
pub fn validate_payload(kind: SubmissionKind, payload: &str) -> SubmitResult<String> {
    match kind {
        SubmissionKind::Paste => {
            if payload.trim().is_empty() {
                return Err(SubmitError::validation("paste content is empty"));
            }
            Ok(payload.to_string())
        }
        SubmissionKind::Archive => validate_social_post_url(payload)
            .map(|post| post.url)
            .map_err(|e| SubmitError::validation(format!("not a Twitter/X post URL ({})", e))),
    }
}
