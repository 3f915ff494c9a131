//! Per-submission state tracking and cancellation.

use std::future::Future;

use tkit_models::{SubmissionKind, SubmissionState};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{SubmitError, SubmitResult};

/// Optional caller hooks for one submission.
#[derive(Debug, Default)]
pub struct SubmitHooks {
    /// Flipping to `true` cancels before the next request or during a backoff wait
    pub cancel: Option<watch::Receiver<bool>>,
    /// Receives every state transition
    pub state: Option<watch::Sender<SubmissionState>>,
}

impl SubmitHooks {
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_state(mut self, state: watch::Sender<SubmissionState>) -> Self {
        self.state = Some(state);
        self
    }
}

/// Owns the state of a single submission.
#[derive(Debug)]
pub struct SubmissionTracker {
    kind: SubmissionKind,
    state: SubmissionState,
    hooks: SubmitHooks,
}

impl SubmissionTracker {
    pub fn new(kind: SubmissionKind, hooks: SubmitHooks) -> Self {
        Self {
            kind,
            state: SubmissionState::Idle,
            hooks,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// Move to `next`, publishing it to the state hook.
    pub fn transition(&mut self, next: SubmissionState) {
        if !self.state.can_transition_to(&next) {
            warn!(kind = %self.kind, from = ?self.state, to = ?next, "Unexpected submission transition");
        }
        debug!(kind = %self.kind, from = ?self.state, to = ?next, "Submission state");

        self.state = next;
        if let Some(tx) = &self.hooks.state {
            tx.send_replace(next);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.hooks.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub fn ensure_not_cancelled(&self) -> SubmitResult<()> {
        if self.is_cancelled() {
            Err(SubmitError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Await `wait` unless cancellation arrives first.
    pub async fn wait_or_cancel<F>(&mut self, wait: F) -> SubmitResult<()>
    where
        F: Future<Output = ()>,
    {
        self.ensure_not_cancelled()?;

        let Some(cancel) = self.hooks.cancel.as_mut() else {
            wait.await;
            return Ok(());
        };

        tokio::select! {
            _ = wait => Ok(()),
            _ = cancelled(cancel) => Err(SubmitError::Cancelled),
        }
    }
}

/// Resolves once the flag turns `true`; never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
