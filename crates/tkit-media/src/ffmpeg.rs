//! FFmpeg-backed recorder.
//!
//! Raw RGBA frames are written to FFmpeg's stdin; the encoded WebM stream is
//! read from stdout in fixed-size segments while frames are still arriving.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, EVEN_DIMENSIONS_FILTER};
use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, EncodeProgress};
use crate::recorder::{Recorder, RecordingSession, StreamSpec};

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// How long a failed write waits for FFmpeg to exit and flush stderr.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// FFmpeg recorder configuration.
#[derive(Debug, Clone)]
pub struct FfmpegRecorderConfig {
    /// FFmpeg executable name or path
    pub binary: String,
    /// Video codec
    pub codec: String,
    /// Target video bitrate
    pub bitrate: String,
    /// Size of each buffered output segment
    pub segment_bytes: usize,
}

impl Default for FfmpegRecorderConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            codec: "libvpx".to_string(),
            bitrate: "1M".to_string(),
            segment_bytes: 64 * 1024,
        }
    }
}

impl FfmpegRecorderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            binary: std::env::var("TKIT_FFMPEG_BIN").unwrap_or(defaults.binary),
            codec: std::env::var("TKIT_VIDEO_CODEC").unwrap_or(defaults.codec),
            bitrate: std::env::var("TKIT_VIDEO_BITRATE").unwrap_or(defaults.bitrate),
            segment_bytes: std::env::var("TKIT_SEGMENT_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.segment_bytes),
        }
    }
}

/// Records WebM video by piping frames through FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRecorder {
    config: FfmpegRecorderConfig,
}

impl FfmpegRecorder {
    pub fn new(config: FfmpegRecorderConfig) -> Self {
        Self { config }
    }

    fn resolve_binary(&self) -> MediaResult<PathBuf> {
        which::which(&self.config.binary).map_err(|e| {
            MediaError::RecorderUnavailable(format!("{} not found: {}", self.config.binary, e))
        })
    }

    fn build_command(&self, spec: &StreamSpec) -> FfmpegCommand {
        FfmpegCommand::piped()
            .raw_rgba_input(spec)
            .video_filter(EVEN_DIMENSIONS_FILTER)
            .video_codec(&self.config.codec)
            .video_bitrate(&self.config.bitrate)
            .pixel_format("yuv420p")
            .no_audio()
            .format("webm")
    }
}

#[async_trait]
impl Recorder for FfmpegRecorder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn mime_type(&self) -> &str {
        "video/webm"
    }

    fn extension(&self) -> &str {
        "webm"
    }

    fn check_available(&self) -> MediaResult<()> {
        self.resolve_binary().map(|_| ())
    }

    async fn start(&self, spec: &StreamSpec) -> MediaResult<Box<dyn RecordingSession>> {
        let binary = self.resolve_binary()?;
        let args = self.build_command(spec).build_args();
        debug!("Running FFmpeg: {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::RecorderUnavailable(format!("failed to spawn FFmpeg: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::recorder_failed("FFmpeg stdin not captured", None, None))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::recorder_failed("FFmpeg stdout not captured", None, None))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::recorder_failed("FFmpeg stderr not captured", None, None))?;

        let segment_bytes = self.config.segment_bytes.max(1);
        let collector = tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut segments = Vec::new();
            loop {
                let mut segment = Vec::with_capacity(segment_bytes);
                let read = (&mut reader)
                    .take(segment_bytes as u64)
                    .read_to_end(&mut segment)
                    .await?;
                if read == 0 {
                    break;
                }
                segments.push(segment);
            }
            Ok::<_, std::io::Error>(segments)
        });

        let monitor = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut progress = EncodeProgress::default();
            let mut tail: Vec<String> = Vec::new();

            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(snapshot) = parse_progress_line(&line, &mut progress) {
                    debug!(
                        frame = snapshot.frame,
                        out_time_ms = snapshot.out_time_ms,
                        speed = snapshot.speed,
                        "FFmpeg progress"
                    );
                } else if !is_progress_line(&line) {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            tail.join("\n")
        });

        info!(
            width = spec.width,
            height = spec.height,
            fps = spec.frame_rate,
            "FFmpeg recorder started"
        );

        Ok(Box::new(FfmpegSession {
            child,
            stdin: Some(stdin),
            collector,
            monitor: Some(monitor),
            frame_len: spec.frame_len(),
            frames_written: 0,
        }))
    }
}

struct FfmpegSession {
    child: Child,
    stdin: Option<ChildStdin>,
    collector: JoinHandle<std::io::Result<Vec<Vec<u8>>>>,
    monitor: Option<JoinHandle<String>>,
    frame_len: usize,
    frames_written: u64,
}

impl FfmpegSession {
    /// Stderr tail once FFmpeg has closed its stderr, bounded by `wait`.
    async fn stderr_tail(monitor: Option<JoinHandle<String>>, wait: Duration) -> Option<String> {
        let monitor = monitor?;
        tokio::time::timeout(wait, monitor)
            .await
            .ok()
            .and_then(Result::ok)
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl RecordingSession for FfmpegSession {
    async fn write_frame(&mut self, frame: &[u8]) -> MediaResult<()> {
        if frame.len() != self.frame_len {
            return Err(MediaError::recorder_failed(
                format!("frame is {} bytes, expected {}", frame.len(), self.frame_len),
                None,
                None,
            ));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::recorder_failed("FFmpeg stdin already closed", None, None))?;

        let written = stdin.write_all(frame).await;
        if let Err(e) = written {
            // A closed pipe means FFmpeg exited; its stderr says why.
            self.stdin.take();
            let stderr = Self::stderr_tail(self.monitor.take(), STDERR_DRAIN_TIMEOUT).await;
            let exit_code = self
                .child
                .try_wait()
                .ok()
                .flatten()
                .and_then(|status| status.code());
            warn!(
                frames = self.frames_written,
                exit_code = ?exit_code,
                "FFmpeg stopped accepting frames"
            );
            return Err(MediaError::recorder_failed(
                format!("FFmpeg stopped accepting frames after {}: {}", self.frames_written, e),
                stderr,
                exit_code,
            ));
        }
        self.frames_written += 1;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> MediaResult<Vec<Vec<u8>>> {
        let FfmpegSession {
            mut child,
            stdin,
            collector,
            monitor,
            frames_written,
            ..
        } = *self;

        // Closing stdin signals end of stream.
        if let Some(mut stdin) = stdin {
            if let Err(e) = stdin.shutdown().await {
                warn!("Failed to close FFmpeg stdin: {}", e);
            }
        }

        let status = child.wait().await?;
        let segments = collector.await.map_err(|e| {
            MediaError::recorder_failed(format!("output collector failed: {}", e), None, None)
        })?;
        let stderr = Self::stderr_tail(monitor, STDERR_DRAIN_TIMEOUT).await;

        if !status.success() {
            return Err(MediaError::recorder_failed(
                "FFmpeg exited with non-zero status",
                stderr,
                status.code(),
            ));
        }

        let segments = segments?;
        debug!(
            frames = frames_written,
            segments = segments.len(),
            "FFmpeg recorder finished"
        );
        Ok(segments)
    }

    async fn abort(mut self: Box<Self>) {
        self.stdin.take();
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill FFmpeg: {}", e);
        }
        self.collector.abort();
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        info!(frames = self.frames_written, "FFmpeg recorder aborted");
    }
}
