//! Encoder configuration.

use std::path::PathBuf;

use tkit_media::FfmpegRecorderConfig;
use tkit_models::job::{DEFAULT_DURATION_SECS, DEFAULT_FRAME_RATE, DEFAULT_REFRESH_HZ};
use tkit_models::{EncodeJob, ScheduleStrategy};
use tracing::warn;

/// Settings for `tkit video`, before CLI overrides.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub frame_rate: u32,
    pub duration_secs: u32,
    pub schedule: ScheduleStrategy,
    /// Display refresh rate for the refresh-synced schedule
    pub refresh_hz: u32,
    /// Where finished videos are saved
    pub output_dir: PathBuf,
    pub recorder: FfmpegRecorderConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            duration_secs: DEFAULT_DURATION_SECS,
            schedule: ScheduleStrategy::FixedInterval,
            refresh_hz: DEFAULT_REFRESH_HZ,
            output_dir: PathBuf::from("."),
            recorder: FfmpegRecorderConfig::default(),
        }
    }
}

impl EncoderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let refresh_hz = std::env::var("TKIT_REFRESH_HZ")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_HZ);

        let schedule = match std::env::var("TKIT_SCHEDULE") {
            Ok(name) => ScheduleStrategy::parse(&name, refresh_hz).unwrap_or_else(|| {
                warn!(schedule = %name, "Unknown TKIT_SCHEDULE, using fixed interval");
                ScheduleStrategy::FixedInterval
            }),
            Err(_) => ScheduleStrategy::FixedInterval,
        };

        Self {
            frame_rate: std::env::var("TKIT_FRAME_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FRAME_RATE),
            duration_secs: std::env::var("TKIT_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DURATION_SECS),
            schedule,
            refresh_hz,
            output_dir: std::env::var("TKIT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            recorder: FfmpegRecorderConfig::from_env(),
        }
    }

    /// Build the encode job described by this config.
    pub fn job(&self) -> EncodeJob {
        EncodeJob::new(self.frame_rate, self.duration_secs).with_schedule(self.schedule)
    }
}
