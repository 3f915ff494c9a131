//! Encode job definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Default capture frame rate.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Default clip duration in seconds.
pub const DEFAULT_DURATION_SECS: u32 = 5;

/// Default display refresh rate for refresh-synchronized scheduling.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Unique identifier for an encode job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How redraws are paced while a job records.
///
/// Both strategies produce exactly [`EncodeJob::total_frames`] redraws; they
/// only differ in what wakes the draw loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ScheduleStrategy {
    /// Fixed-period timer at the job frame rate.
    #[default]
    FixedInterval,
    /// Display refresh callbacks, releasing a redraw once each frame is due.
    RefreshSynced { refresh_hz: u32 },
}

impl ScheduleStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStrategy::FixedInterval => "fixed",
            ScheduleStrategy::RefreshSynced { .. } => "refresh",
        }
    }

    /// Time between display refresh callbacks, for the refresh-synced schedule.
    pub fn refresh_period(&self) -> Option<Duration> {
        match self {
            ScheduleStrategy::FixedInterval => None,
            ScheduleStrategy::RefreshSynced { refresh_hz } => {
                Some(Duration::from_secs(1) / (*refresh_hz).max(1))
            }
        }
    }

    /// Parse a strategy name as used in config and CLI flags.
    pub fn parse(name: &str, refresh_hz: u32) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fixed" | "interval" | "fixed_interval" => Some(ScheduleStrategy::FixedInterval),
            "refresh" | "vsync" | "refresh_synced" => {
                Some(ScheduleStrategy::RefreshSynced { refresh_hz })
            }
            _ => None,
        }
    }
}

/// Rejected job parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidJob {
    #[error("frame rate must be greater than zero")]
    ZeroFrameRate,

    #[error("duration must be greater than zero seconds")]
    ZeroDuration,

    #[error("refresh rate must be greater than zero")]
    ZeroRefreshRate,

    #[error("frame rate {0} is too high to schedule")]
    FrameRateTooHigh(u32),

    #[error("refresh rate {0} is too high to schedule")]
    RefreshRateTooHigh(u32),
}

/// A bounded unit of work producing exactly `total_frames` redraws.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeJob {
    /// Unique job ID
    pub id: JobId,
    /// Target capture frame rate
    pub frame_rate: u32,
    /// Target clip duration in seconds
    pub duration_secs: u32,
    /// Redraw pacing
    #[serde(default)]
    pub schedule: ScheduleStrategy,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl EncodeJob {
    pub fn new(frame_rate: u32, duration_secs: u32) -> Self {
        Self {
            id: JobId::new(),
            frame_rate,
            duration_secs,
            schedule: ScheduleStrategy::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_schedule(mut self, schedule: ScheduleStrategy) -> Self {
        self.schedule = schedule;
        self
    }

    /// Number of redraws the job must issue before finalizing.
    pub fn total_frames(&self) -> u64 {
        u64::from(self.frame_rate) * u64::from(self.duration_secs)
    }

    /// Nominal time between two redraws.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }

    pub fn validate(&self) -> Result<(), InvalidJob> {
        if self.frame_rate == 0 {
            return Err(InvalidJob::ZeroFrameRate);
        }
        if self.duration_secs == 0 {
            return Err(InvalidJob::ZeroDuration);
        }
        // Periods are whole nanoseconds; rates above 1 GHz truncate to zero.
        if self.frame_period().is_zero() {
            return Err(InvalidJob::FrameRateTooHigh(self.frame_rate));
        }
        if let ScheduleStrategy::RefreshSynced { refresh_hz } = self.schedule {
            if refresh_hz == 0 {
                return Err(InvalidJob::ZeroRefreshRate);
            }
            if self.schedule.refresh_period().is_some_and(|p| p.is_zero()) {
                return Err(InvalidJob::RefreshRateTooHigh(refresh_hz));
            }
        }
        Ok(())
    }
}

impl Default for EncodeJob {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE, DEFAULT_DURATION_SECS)
    }
}

/// Lifecycle of a single encode job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum EncodeState {
    #[default]
    Idle,
    /// Surface and recorder are being set up
    Preparing,
    /// Redraw `frame` of `total` has been issued
    Recording { frame: u64, total: u64 },
    /// Recorder stopped, segments being assembled
    Finalizing,
    Completed,
    Failed,
}

impl EncodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EncodeState::Completed | EncodeState::Failed)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, EncodeState::Idle) && !self.is_terminal()
    }
}
