//! Error types for media operations.

use thiserror::Error;
use tkit_models::InvalidJob;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while turning an image into a video.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image could not be decoded: {0}")]
    Decode(String),

    #[error("Invalid encode job: {0}")]
    InvalidJob(#[from] InvalidJob),

    #[error("Recorder unavailable: {0}")]
    RecorderUnavailable(String),

    #[error("Recorder failed: {message}")]
    RecorderFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Another encode job is already running")]
    EncoderBusy,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a decode failure error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a recorder failure error.
    pub fn recorder_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::RecorderFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Short machine-readable kind, used for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            MediaError::Decode(_) => "decode",
            MediaError::InvalidJob(_) => "invalid_job",
            MediaError::RecorderUnavailable(_) => "recorder_unavailable",
            MediaError::RecorderFailed { .. } => "recorder_failed",
            MediaError::EncoderBusy => "encoder_busy",
            MediaError::Cancelled => "cancelled",
            MediaError::Io(_) => "io",
        }
    }

    /// Whether trying the same operation later could succeed.
    ///
    /// Encoding is never retried internally; this only drives user messaging.
    pub fn is_transient(&self) -> bool {
        matches!(self, MediaError::EncoderBusy)
    }

    /// Human-readable message for end users.
    pub fn user_message(&self) -> String {
        match self {
            MediaError::Decode(_) => {
                "The selected file could not be read as an image. Choose a different picture."
                    .to_string()
            }
            MediaError::InvalidJob(e) => format!("The video settings are invalid: {}.", e),
            MediaError::RecorderUnavailable(_) => {
                "Video recording is not supported in this environment (FFmpeg was not found)."
                    .to_string()
            }
            MediaError::RecorderFailed { .. } => {
                "The video encoder stopped unexpectedly. The video was not created.".to_string()
            }
            MediaError::EncoderBusy => {
                "A video is already being generated. Try again when it finishes.".to_string()
            }
            MediaError::Cancelled => "Video generation was cancelled.".to_string(),
            MediaError::Io(e) => format!("The video could not be saved: {}.", e),
        }
    }
}
