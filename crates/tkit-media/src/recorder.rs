//! Recording capability.
//!
//! A [`Recorder`] turns a sequence of surface frames into an encoded stream.
//! The encoder treats it as opaque: if [`Recorder::check_available`] fails the
//! job ends with `RecorderUnavailable` before any surface is allocated.

use async_trait::async_trait;

use crate::error::MediaResult;

/// Geometry and rate of the stream being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl StreamSpec {
    /// Bytes in one RGBA frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Factory for recording sessions.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// MIME type of the produced stream.
    fn mime_type(&self) -> &str;

    /// File extension matching [`Recorder::mime_type`].
    fn extension(&self) -> &str;

    /// Fail with `RecorderUnavailable` if recording cannot work here.
    fn check_available(&self) -> MediaResult<()>;

    /// Begin recording a stream bound to a surface of `spec` geometry.
    async fn start(&self, spec: &StreamSpec) -> MediaResult<Box<dyn RecordingSession>>;
}

/// One in-progress recording.
#[async_trait]
pub trait RecordingSession: Send {
    /// Capture the current surface contents.
    async fn write_frame(&mut self, frame: &[u8]) -> MediaResult<()>;

    /// Stop recording and return the buffered output segments in order.
    async fn finish(self: Box<Self>) -> MediaResult<Vec<Vec<u8>>>;

    /// Stop recording and discard everything.
    async fn abort(self: Box<Self>);
}
