//! Shared data models for the toolkit pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Encode jobs and frame scheduling strategies
//! - Submission kinds, requests and the per-submission state machine
//! - Social-post URL validation for archive submissions

pub mod job;
pub mod social;
pub mod submission;

// Re-export common types
pub use job::{EncodeJob, EncodeState, InvalidJob, JobId, ScheduleStrategy};
pub use social::{validate_social_post_url, SocialPostUrl, SocialUrlError};
pub use submission::{SubmissionKind, SubmissionRequest, SubmissionState};
