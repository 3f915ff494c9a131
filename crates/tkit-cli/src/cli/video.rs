use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tkit_media::{EncoderStudio, FfmpegRecorder, FrameCaptureEncoder, SourceImage};
use tkit_models::{EncodeState, ScheduleStrategy};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::EncoderConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScheduleArg {
    /// Fixed-period timer at the frame rate
    Fixed,
    /// Redraw on display refresh ticks once a frame is due
    Refresh,
}

#[derive(Parser, Debug)]
pub struct VideoCommand {
    /// Still image to record (PNG, JPEG, GIF, WebP, BMP)
    pub image: PathBuf,

    /// Capture frame rate [env: TKIT_FRAME_RATE, default 30]
    #[arg(long)]
    pub fps: Option<u32>,

    /// Clip duration in seconds [env: TKIT_DURATION_SECS, default 5]
    #[arg(long)]
    pub seconds: Option<u32>,

    /// Redraw pacing [env: TKIT_SCHEDULE, default fixed]
    #[arg(long, value_enum)]
    pub schedule: Option<ScheduleArg>,

    /// Display refresh rate for the refresh schedule [env: TKIT_REFRESH_HZ, default 60]
    #[arg(long)]
    pub refresh_hz: Option<u32>,

    /// Output directory [env: TKIT_OUTPUT_DIR, default .]
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl VideoCommand {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, mut config: EncoderConfig) -> EncoderConfig {
        if let Some(fps) = self.fps {
            config.frame_rate = fps;
        }
        if let Some(seconds) = self.seconds {
            config.duration_secs = seconds;
        }
        if let Some(hz) = self.refresh_hz {
            config.refresh_hz = hz;
        }
        config.schedule = match self.schedule {
            Some(ScheduleArg::Fixed) => ScheduleStrategy::FixedInterval,
            Some(ScheduleArg::Refresh) => ScheduleStrategy::RefreshSynced {
                refresh_hz: config.refresh_hz,
            },
            None => match config.schedule {
                ScheduleStrategy::RefreshSynced { .. } => ScheduleStrategy::RefreshSynced {
                    refresh_hz: config.refresh_hz,
                },
                fixed => fixed,
            },
        };
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        config
    }

    pub async fn run(self, cancel: watch::Receiver<bool>) -> Result<()> {
        let config = self.apply(EncoderConfig::from_env());
        let job = config.job();
        info!(
            job_id = %job.id,
            image = %self.image.display(),
            frames = job.total_frames(),
            schedule = job.schedule.as_str(),
            "Generating video"
        );

        let image = SourceImage::open(&self.image).await?;
        let recorder = Arc::new(FfmpegRecorder::new(config.recorder.clone()));
        let studio = EncoderStudio::new(FrameCaptureEncoder::new(recorder));

        let progress = tokio::spawn(report_progress(studio.encoder().subscribe()));
        let result = studio.generate(&image, &job, Some(cancel)).await;
        progress.abort();
        let artifact = result?;

        let path = artifact.save_to(&config.output_dir).await?;

        println!("{}", artifact.url());
        println!("{}", path.display());
        info!(
            job_id = %job.id,
            frames = artifact.frames(),
            bytes = artifact.len(),
            path = %path.display(),
            "Video saved"
        );
        Ok(())
    }
}

async fn report_progress(mut state: watch::Receiver<EncodeState>) {
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        match current {
            EncodeState::Recording { frame, total } if frame % 30 == 0 || frame == total => {
                info!(frame, total, "Recording");
            }
            EncodeState::Recording { .. } => {}
            other => debug!(state = ?other, "Encoder state"),
        }
    }
}
