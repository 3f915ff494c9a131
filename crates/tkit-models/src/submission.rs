//! Submission request and state machine types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Remote target of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    /// Arbitrary text published to a paste service
    Paste,
    /// Social-post URL submitted to an archival service
    Archive,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Paste => "paste",
            SubmissionKind::Archive => "archive",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single submission, owned by the client for the duration of one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Text or URL to publish
    pub payload: String,
    /// Target service
    pub kind: SubmissionKind,
    /// Attempts issued so far (0 before the first request)
    pub attempt: u32,
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
}

impl SubmissionRequest {
    pub fn new(kind: SubmissionKind, payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            kind,
            attempt: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Count a new attempt and return its 1-based number.
    pub fn record_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Whether another attempt may follow the current one.
    pub fn retries_remaining(&self) -> bool {
        self.attempt <= self.max_retries
    }

    /// Total attempts this request may issue.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// States of one submission.
///
/// ```text
/// Idle -> Validating -> Failed
///                    -> Requesting -> Parsing -> Succeeded | Failed
///                                  -> BackoffWait -> Requesting
///                                  -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    Requesting { attempt: u32 },
    BackoffWait { attempt: u32, delay_ms: u64 },
    Parsing,
    Succeeded,
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Succeeded | SubmissionState::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: &SubmissionState) -> bool {
        use SubmissionState::*;

        match (self, next) {
            (Idle, Validating) => true,
            (Validating, Requesting { attempt: 1 }) => true,
            (Requesting { .. }, Parsing) => true,
            (Requesting { attempt }, BackoffWait { attempt: waited, .. }) => attempt == waited,
            (BackoffWait { attempt, .. }, Requesting { attempt: next }) => *next == attempt + 1,
            (Parsing, Succeeded) => true,
            // Cancellation may interrupt any non-terminal state.
            (current, Failed) => !current.is_terminal() && *current != Idle,
            _ => false,
        }
    }
}
