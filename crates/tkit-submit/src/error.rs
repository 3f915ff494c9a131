//! Submission error types.

use thiserror::Error;

pub type SubmitResult<T> = Result<T, SubmitError>;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Transport error: {message}")]
    Transport { message: String, status: Option<u16> },

    #[error("No link found in response (HTTP {status})")]
    UnparsableResponse { status: u16, snippet: String },

    #[error("Submission cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "timed out"
        } else if e.is_connect() {
            "connection failed"
        } else if e.is_body() || e.is_decode() {
            "response body unreadable"
        } else {
            "request failed"
        };
        SubmitError::Transport {
            message: format!("{}: {}", kind, e),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

impl SubmitError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: msg.into(),
            status,
        }
    }

    /// Retried internally by the client.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::RateLimited { .. })
    }

    /// Whether the caller may reasonably try the whole operation again later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SubmitError::RateLimited { .. } | SubmitError::Transport { .. }
        )
    }

    /// The remote may already hold the content even though no link came back.
    pub fn is_ambiguous_success(&self) -> bool {
        matches!(self, SubmitError::UnparsableResponse { .. })
    }

    /// Short machine-readable kind, used for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::Validation(_) => "validation",
            SubmitError::RateLimited { .. } => "rate_limited",
            SubmitError::Transport { .. } => "transport",
            SubmitError::UnparsableResponse { .. } => "unparsable_response",
            SubmitError::Cancelled => "cancelled",
            SubmitError::Config(_) => "config",
        }
    }

    /// Human-readable message for end users.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(reason) => format!("Please check your input: {}.", reason),
            SubmitError::RateLimited { .. } => {
                "The service is rate limiting requests right now. Try again later.".to_string()
            }
            SubmitError::Transport { .. } => {
                "Upload failed. Check your internet connection.".to_string()
            }
            SubmitError::UnparsableResponse { .. } => {
                "The service answered but no link could be found. The content may already have been accepted; check before submitting again."
                    .to_string()
            }
            SubmitError::Cancelled => "The submission was cancelled.".to_string(),
            SubmitError::Config(reason) => format!("The client is misconfigured: {}.", reason),
        }
    }
}
