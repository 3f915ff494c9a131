use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tkit_models::SubmissionKind;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;

use super::archive::submit;

#[derive(Parser, Debug)]
pub struct PasteCommand {
    /// Text to publish; read from stdin when neither TEXT nor --file is given
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// Publish the contents of a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl PasteCommand {
    pub async fn run(self, cancel: watch::Receiver<bool>) -> Result<()> {
        let text = self.read_text().await?;
        let link = submit(SubmissionKind::Paste, &text, cancel).await?;
        println!("{}", link);
        Ok(())
    }

    async fn read_text(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        if let Some(path) = &self.file {
            return tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()));
        }

        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        Ok(text)
    }
}
