//! Resilient submission client.
//!
//! Publishes text to a paste service or a social-post URL to an archival
//! service and returns the durable link. Rate-limit answers are retried with
//! linear backoff; every other failure is classified and surfaced:
//! - [`SubmitError::Validation`]: bad input, no request made
//! - [`SubmitError::RateLimited`]: retry budget spent
//! - [`SubmitError::Transport`]: network failure or HTTP error status
//! - [`SubmitError::UnparsableResponse`]: accepted but no link found

pub mod client;
pub mod config;
pub mod error;
pub mod parse;
pub mod retry;
pub mod tracker;
pub mod transport;

pub use client::{validate_payload, SubmissionClient};
pub use config::{EndpointConfig, PasteConfig, SubmitConfig};
pub use error::{SubmitError, SubmitResult};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use tracker::SubmitHooks;
