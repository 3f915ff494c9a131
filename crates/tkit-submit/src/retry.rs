//! Rate-limit retry with linear backoff.
//!
//! Only explicit rate-limit answers are retried. Transport failures of unknown
//! outcome are surfaced instead: without an idempotency key a retry could
//! publish the same content twice.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tkit_models::{SubmissionRequest, SubmissionState};
use tracing::warn;

use crate::error::{SubmitError, SubmitResult};
use crate::tracker::SubmissionTracker;

/// Retry budget and backoff base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries (not including the initial attempt).
    pub max_retries: u32,
    /// Delay after the first rate-limited attempt; grows linearly.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay after the 1-based `attempt` was rate limited.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }
}

/// Waits out backoff delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Run `operation` until it succeeds, fails for a reason other than rate
/// limiting, or the retry budget in `request` is spent.
///
/// `operation` receives the 1-based attempt number. Attempts are strictly
/// sequential and each waits out its full backoff first.
pub(crate) async fn retry_on_rate_limit<F, Fut, T>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    request: &mut SubmissionRequest,
    tracker: &mut SubmissionTracker,
    mut operation: F,
) -> SubmitResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = SubmitResult<T>>,
{
    loop {
        tracker.ensure_not_cancelled()?;

        let attempt = request.record_attempt();
        tracker.transition(SubmissionState::Requesting { attempt });

        match operation(attempt).await {
            Err(e) if e.is_retryable() && request.retries_remaining() => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    kind = %request.kind,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Submission rate limited, backing off"
                );
                counter!("tkit_submission_retries_total", "kind" => request.kind.as_str())
                    .increment(1);

                tracker.transition(SubmissionState::BackoffWait {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
                tracker.wait_or_cancel(sleeper.sleep(delay)).await?;
            }
            Err(e) if e.is_retryable() => {
                return Err(SubmitError::RateLimited { attempts: attempt });
            }
            other => return other,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tkit_models::SubmissionKind;

    /// Records requested delays and returns immediately.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingSleeper {
        pub delays: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(6));
    }

    fn tracker() -> SubmissionTracker {
        let mut tracker = SubmissionTracker::new(SubmissionKind::Archive, Default::default());
        tracker.transition(SubmissionState::Validating);
        tracker
    }

    #[tokio::test]
    async fn test_succeeds_after_rate_limits() {
        let sleeper = RecordingSleeper::default();
        let mut request = SubmissionRequest::new(SubmissionKind::Archive, "u");
        let mut tracker = tracker();

        let result = retry_on_rate_limit(
            &RetryPolicy::default(),
            &sleeper,
            &mut request,
            &mut tracker,
            |attempt| async move {
                if attempt < 3 {
                    Err(SubmitError::RateLimited { attempts: attempt })
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let sleeper = RecordingSleeper::default();
        let mut request = SubmissionRequest::new(SubmissionKind::Archive, "u");
        let mut tracker = tracker();
        let calls = std::sync::atomic::AtomicU32::new(0);

        let result: SubmitResult<()> = retry_on_rate_limit(
            &RetryPolicy::default(),
            &sleeper,
            &mut request,
            &mut tracker,
            |attempt| {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async move { Err(SubmitError::RateLimited { attempts: attempt }) }
            },
        )
        .await;

        assert!(matches!(result, Err(SubmitError::RateLimited { attempts: 4 })));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 4);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let mut request = SubmissionRequest::new(SubmissionKind::Paste, "text");
        let mut tracker = tracker();

        let result: SubmitResult<()> = retry_on_rate_limit(
            &RetryPolicy::default(),
            &sleeper,
            &mut request,
            &mut tracker,
            |_| async { Err(SubmitError::transport("connection reset", None)) },
        )
        .await;

        assert!(matches!(result, Err(SubmitError::Transport { .. })));
        assert_eq!(request.attempt, 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }
}
