//! Frame-capture encoder.
//!
//! Turns a still image into a short silent video: the image is redrawn onto a
//! capturable surface exactly `total_frames` times while a recorder samples
//! the surface, then the recorder's buffered segments are joined into one
//! byte stream.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tkit_models::{EncodeJob, EncodeState};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::FrameClock;
use crate::error::{MediaError, MediaResult};
use crate::recorder::{Recorder, RecordingSession, StreamSpec};
use crate::source::SourceImage;
use crate::surface::Surface;

/// Metric names.
pub mod names {
    pub const ENCODE_JOBS_TOTAL: &str = "tkit_encode_jobs_total";
    pub const FRAMES_DRAWN_TOTAL: &str = "tkit_frames_drawn_total";
    pub const ENCODE_DURATION_SECONDS: &str = "tkit_encode_duration_seconds";
}

/// Result of one completed encode job.
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    /// Concatenated recorder output
    pub data: Vec<u8>,
    pub mime_type: String,
    pub extension: String,
    /// Redraws issued before the recorder stopped
    pub frames_drawn: u64,
    pub width: u32,
    pub height: u32,
}

/// Drives the redraw loop against a [`Recorder`].
pub struct FrameCaptureEncoder {
    recorder: Arc<dyn Recorder>,
    state: watch::Sender<EncodeState>,
}

impl FrameCaptureEncoder {
    pub fn new(recorder: Arc<dyn Recorder>) -> Self {
        let (state, _) = watch::channel(EncodeState::Idle);
        Self { recorder, state }
    }

    /// Observe state transitions of the jobs run by this encoder.
    pub fn subscribe(&self) -> watch::Receiver<EncodeState> {
        self.state.subscribe()
    }

    pub fn recorder(&self) -> &dyn Recorder {
        self.recorder.as_ref()
    }

    fn set_state(&self, state: EncodeState) {
        self.state.send_replace(state);
    }

    /// Encode `image` according to `job`.
    ///
    /// `cancel` is checked before every redraw; flipping it to `true` aborts
    /// the recording and returns [`MediaError::Cancelled`].
    pub async fn encode(
        &self,
        image: &SourceImage,
        job: &EncodeJob,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<EncodedVideo> {
        let started = Instant::now();
        let result = self.run(image, job, cancel).await;

        let outcome = match &result {
            Ok(_) => {
                self.set_state(EncodeState::Completed);
                "completed"
            }
            Err(e) => {
                self.set_state(EncodeState::Failed);
                warn!(job_id = %job.id, kind = e.kind(), "Encode job failed: {}", e);
                e.kind()
            }
        };

        counter!(names::ENCODE_JOBS_TOTAL, "outcome" => outcome).increment(1);
        histogram!(names::ENCODE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        image: &SourceImage,
        job: &EncodeJob,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<EncodedVideo> {
        self.set_state(EncodeState::Preparing);
        job.validate()?;
        self.recorder.check_available()?;

        let mut surface = Surface::for_image(image);
        let spec = StreamSpec {
            width: surface.width(),
            height: surface.height(),
            frame_rate: job.frame_rate,
        };
        let total = job.total_frames();

        info!(
            job_id = %job.id,
            width = spec.width,
            height = spec.height,
            fps = spec.frame_rate,
            frames = total,
            schedule = job.schedule.as_str(),
            recorder = self.recorder.name(),
            "Starting encode job"
        );

        let mut session = self.recorder.start(&spec).await?;
        let mut clock = FrameClock::for_job(job);

        let drawn = self
            .draw_frames(&mut *session, &mut surface, &mut clock, image, total, cancel)
            .await;
        if let Err(e) = drawn {
            session.abort().await;
            return Err(e);
        }

        // The recorder stops only after the final redraw has been captured.
        self.set_state(EncodeState::Finalizing);
        let segments = session.finish().await?;
        let data = concat_segments(segments);

        info!(
            job_id = %job.id,
            frames = surface.draw_count(),
            bytes = data.len(),
            "Encode job finished"
        );

        Ok(EncodedVideo {
            data,
            mime_type: self.recorder.mime_type().to_string(),
            extension: self.recorder.extension().to_string(),
            frames_drawn: surface.draw_count(),
            width: spec.width,
            height: spec.height,
        })
    }

    async fn draw_frames(
        &self,
        session: &mut dyn RecordingSession,
        surface: &mut Surface,
        clock: &mut FrameClock,
        image: &SourceImage,
        total: u64,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        let log_every = (total / 10).max(1);

        for frame in 1..=total {
            clock.tick().await;

            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                info!(frame, total, "Encode job cancelled");
                return Err(MediaError::Cancelled);
            }

            surface.draw_image(image);
            session.write_frame(surface.frame()).await?;
            counter!(names::FRAMES_DRAWN_TOTAL).increment(1);
            self.set_state(EncodeState::Recording { frame, total });

            if frame % log_every == 0 {
                debug!(frame, total, clock = clock.strategy_name(), "Redraw issued");
            }
        }
        Ok(())
    }
}

/// Join recorder segments into a single buffer.
pub fn concat_segments(segments: Vec<Vec<u8>>) -> Vec<u8> {
    let len = segments.iter().map(Vec::len).sum();
    segments.into_iter().fold(Vec::with_capacity(len), |mut out, segment| {
        out.extend_from_slice(&segment);
        out
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::source::tests::png_bytes;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use tkit_models::ScheduleStrategy;

    /// Recorder that counts frames and emits one segment per frame.
    ///
    /// Counters on the recorder are totals across sessions; each session
    /// tracks its own frames.
    #[derive(Default)]
    pub(crate) struct CountingRecorder {
        pub frames: Arc<AtomicU64>,
        pub finished: Arc<AtomicBool>,
        pub aborted: Arc<AtomicBool>,
        /// Set while a session is recording
        pub active: Arc<AtomicBool>,
        pub unavailable: bool,
    }

    struct CountingSession {
        total_frames: Arc<AtomicU64>,
        finished: Arc<AtomicBool>,
        aborted: Arc<AtomicBool>,
        active: Arc<AtomicBool>,
        frames: u64,
        frame_len: usize,
    }

    #[async_trait]
    impl Recorder for CountingRecorder {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn mime_type(&self) -> &str {
            "video/webm"
        }

        fn extension(&self) -> &str {
            "webm"
        }

        fn check_available(&self) -> MediaResult<()> {
            if self.unavailable {
                Err(MediaError::RecorderUnavailable("disabled".into()))
            } else {
                Ok(())
            }
        }

        async fn start(&self, spec: &StreamSpec) -> MediaResult<Box<dyn RecordingSession>> {
            let was_active = self.active.swap(true, Ordering::SeqCst);
            assert!(!was_active, "overlapping recording sessions");
            Ok(Box::new(CountingSession {
                total_frames: self.frames.clone(),
                finished: self.finished.clone(),
                aborted: self.aborted.clone(),
                active: self.active.clone(),
                frames: 0,
                frame_len: spec.frame_len(),
            }))
        }
    }

    #[async_trait]
    impl RecordingSession for CountingSession {
        async fn write_frame(&mut self, frame: &[u8]) -> MediaResult<()> {
            assert_eq!(frame.len(), self.frame_len);
            assert!(self.active.load(Ordering::SeqCst), "frame after stop");
            self.frames += 1;
            self.total_frames.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn finish(self: Box<Self>) -> MediaResult<Vec<Vec<u8>>> {
            self.active.store(false, Ordering::SeqCst);
            self.finished.store(true, Ordering::SeqCst);
            Ok((0..self.frames).map(|i| vec![(i % 251) as u8]).collect())
        }

        async fn abort(self: Box<Self>) {
            self.active.store(false, Ordering::SeqCst);
            self.aborted.store(true, Ordering::SeqCst);
        }
    }

    fn image() -> SourceImage {
        SourceImage::decode(&png_bytes(6, 4)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_draws_exact_frame_count() {
        let recorder = Arc::new(CountingRecorder::default());
        let encoder = FrameCaptureEncoder::new(recorder.clone());

        let video = encoder.encode(&image(), &EncodeJob::default(), None).await.unwrap();

        assert_eq!(video.frames_drawn, 150);
        assert_eq!(recorder.frames.load(Ordering::SeqCst), 150);
        assert_eq!(video.data.len(), 150);
        assert_eq!((video.width, video.height), (6, 4));
        assert_eq!(video.mime_type, "video/webm");
        assert!(recorder.finished.load(Ordering::SeqCst));
        assert_eq!(*encoder.subscribe().borrow(), EncodeState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_synced_draws_exact_frame_count() {
        for refresh_hz in [24, 60, 144] {
            let recorder = Arc::new(CountingRecorder::default());
            let encoder = FrameCaptureEncoder::new(recorder.clone());
            let job = EncodeJob::default()
                .with_schedule(ScheduleStrategy::RefreshSynced { refresh_hz });

            let video = encoder.encode(&image(), &job, None).await.unwrap();

            assert_eq!(video.frames_drawn, 150, "refresh {} Hz", refresh_hz);
            assert_eq!(recorder.frames.load(Ordering::SeqCst), 150);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_job_rejected_before_recording() {
        let recorder = Arc::new(CountingRecorder::default());
        let encoder = FrameCaptureEncoder::new(recorder.clone());

        let err = encoder
            .encode(&image(), &EncodeJob::new(0, 5), None)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::InvalidJob(_)));
        assert_eq!(recorder.frames.load(Ordering::SeqCst), 0);
        assert_eq!(*encoder.subscribe().borrow(), EncodeState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unschedulable_rate_rejected_before_clock() {
        let recorder = Arc::new(CountingRecorder::default());
        let encoder = FrameCaptureEncoder::new(recorder.clone());

        let fast = EncodeJob::new(2_000_000_000, 1);
        let err = encoder.encode(&image(), &fast, None).await.unwrap_err();
        assert!(matches!(
            err,
            MediaError::InvalidJob(tkit_models::InvalidJob::FrameRateTooHigh(_))
        ));

        let fast_refresh = EncodeJob::default()
            .with_schedule(ScheduleStrategy::RefreshSynced { refresh_hz: 2_000_000_000 });
        let err = encoder.encode(&image(), &fast_refresh, None).await.unwrap_err();
        assert!(matches!(
            err,
            MediaError::InvalidJob(tkit_models::InvalidJob::RefreshRateTooHigh(_))
        ));
        assert_eq!(recorder.frames.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_unavailable() {
        let recorder = Arc::new(CountingRecorder {
            unavailable: true,
            ..Default::default()
        });
        let encoder = FrameCaptureEncoder::new(recorder.clone());

        let err = encoder
            .encode(&image(), &EncodeJob::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::RecorderUnavailable(_)));
        assert_eq!(recorder.frames.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_recording() {
        let recorder = Arc::new(CountingRecorder::default());
        let encoder = FrameCaptureEncoder::new(recorder.clone());
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let mut states = encoder.subscribe();
        let image = image();
        let job = EncodeJob::default();
        let encode = encoder.encode(&image, &job, Some(cancel_rx));
        let cancel = async {
            loop {
                states.changed().await.unwrap();
                let state = *states.borrow();
                if matches!(state, EncodeState::Recording { frame, .. } if frame >= 10) {
                    cancel_tx.send(true).unwrap();
                    break;
                }
            }
        };

        let (result, _) = tokio::join!(encode, cancel);

        assert!(matches!(result, Err(MediaError::Cancelled)));
        assert!(recorder.aborted.load(Ordering::SeqCst));
        assert!(!recorder.finished.load(Ordering::SeqCst));
        assert!(recorder.frames.load(Ordering::SeqCst) < 150);
    }

    #[test]
    fn test_concat_segments() {
        let data = concat_segments(vec![b"ab".to_vec(), Vec::new(), b"cde".to_vec()]);
        assert_eq!(data, b"abcde");
    }
}
