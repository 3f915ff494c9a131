//! Redraw pacing.
//!
//! A [`FrameClock`] only decides *when* the next redraw may happen. How many
//! redraws a job issues is fixed by the encoder loop, so scheduling jitter can
//! stretch or compress wall-clock time but never changes the frame count.

use std::time::Duration;

use tkit_models::{EncodeJob, ScheduleStrategy};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Source of redraw ticks for one encode job.
#[derive(Debug)]
pub enum FrameClock {
    /// Fixed-period timer at the capture frame rate.
    Fixed { interval: Interval },
    /// Display refresh ticks; a redraw is released on the first refresh at
    /// or after each frame deadline.
    RefreshSynced {
        refresh: Interval,
        frame_period: Duration,
        slack: Duration,
        next_due: Instant,
    },
}

impl FrameClock {
    /// Build the clock for a job. The first tick completes immediately.
    ///
    /// The job must have passed [`EncodeJob::validate`]; tokio timers reject
    /// zero periods.
    pub fn for_job(job: &EncodeJob) -> Self {
        let frame_period = job.frame_period();

        match job.schedule {
            ScheduleStrategy::FixedInterval => {
                let mut interval = time::interval(frame_period);
                // Late ticks catch up so the recorded duration stays close to nominal.
                interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
                FrameClock::Fixed { interval }
            }
            ScheduleStrategy::RefreshSynced { .. } => {
                let refresh_period = job.schedule.refresh_period().unwrap_or(frame_period);
                let mut refresh = time::interval(refresh_period);
                refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
                FrameClock::RefreshSynced {
                    refresh,
                    frame_period,
                    // Deadlines within half a refresh count as reached.
                    slack: refresh_period / 2,
                    next_due: Instant::now(),
                }
            }
        }
    }

    /// Wait until the next redraw may be issued.
    pub async fn tick(&mut self) {
        match self {
            FrameClock::Fixed { interval } => {
                interval.tick().await;
            }
            FrameClock::RefreshSynced {
                refresh,
                frame_period,
                slack,
                next_due,
            } => loop {
                let now = refresh.tick().await;
                if now + *slack >= *next_due {
                    *next_due += *frame_period;
                    // A long stall releases one redraw, not a burst.
                    if *next_due < now {
                        *next_due = now + *frame_period;
                    }
                    return;
                }
            },
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        match self {
            FrameClock::Fixed { .. } => "fixed",
            FrameClock::RefreshSynced { .. } => "refresh",
        }
    }
}
