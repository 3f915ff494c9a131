use anyhow::Result;
use clap::Parser;
use tkit_models::{SubmissionKind, SubmissionState};
use tkit_submit::{SubmissionClient, SubmitHooks};
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
pub struct ArchiveCommand {
    /// Twitter/X post URL (https://x.com/<user>/status/<id>)
    pub url: String,
}

impl ArchiveCommand {
    pub async fn run(self, cancel: watch::Receiver<bool>) -> Result<()> {
        let link = submit(SubmissionKind::Archive, &self.url, cancel).await?;
        println!("{}", link);
        Ok(())
    }
}

/// Submit through an env-configured client, logging state changes.
pub(super) async fn submit(
    kind: SubmissionKind,
    payload: &str,
    cancel: watch::Receiver<bool>,
) -> Result<String> {
    let client = SubmissionClient::from_env()?;

    let (state_tx, state_rx) = watch::channel(SubmissionState::Idle);
    let hooks = SubmitHooks::default()
        .with_cancel(cancel)
        .with_state(state_tx);

    let progress = tokio::spawn(report_state(kind, state_rx));
    let result = client.submit_with(kind, payload, hooks).await;
    progress.abort();

    Ok(result?)
}

async fn report_state(kind: SubmissionKind, mut state: watch::Receiver<SubmissionState>) {
    while state.changed().await.is_ok() {
        match *state.borrow_and_update() {
            SubmissionState::Requesting { attempt } => info!(%kind, attempt, "Submitting"),
            SubmissionState::BackoffWait { attempt, delay_ms } => {
                info!(%kind, attempt, delay_ms, "Rate limited, waiting")
            }
            _ => {}
        }
    }
}
