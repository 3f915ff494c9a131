//! Frame-capture encoder: still image to short silent video.
//!
//! This crate provides:
//! - Image decoding into a read-only source raster
//! - A capturable surface redrawn on a fixed or refresh-synchronized clock
//! - A recorder capability with an FFmpeg implementation (WebM over pipes)
//! - Revocable access URLs for finished artifacts and atomic download
//! - A single-slot studio that serializes encode jobs

pub mod artifact;
pub mod clock;
pub mod command;
pub mod encoder;
pub mod error;
pub mod ffmpeg;
pub mod progress;
pub mod recorder;
pub mod source;
pub mod studio;
pub mod surface;

pub use artifact::{ObjectUrlRegistry, VideoArtifact, DOWNLOAD_STEM};
pub use clock::FrameClock;
pub use command::FfmpegCommand;
pub use encoder::{concat_segments, EncodedVideo, FrameCaptureEncoder};
pub use error::{MediaError, MediaResult};
pub use ffmpeg::{FfmpegRecorder, FfmpegRecorderConfig};
pub use progress::EncodeProgress;
pub use recorder::{Recorder, RecordingSession, StreamSpec};
pub use source::SourceImage;
pub use studio::EncoderStudio;
pub use surface::Surface;
