use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

mod archive;
mod paste;
mod video;

pub use archive::ArchiveCommand;
pub use paste::PasteCommand;
pub use video::{ScheduleArg, VideoCommand};

#[derive(Parser, Debug)]
#[command(name = "tkit")]
#[command(about = "Turn a still image into a short video, or publish text and posts for safekeeping")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a still image into a short silent WebM video
    Video(VideoCommand),
    /// Publish text to the paste service and print its link
    Paste(PasteCommand),
    /// Archive a Twitter/X post and print the snapshot link
    Archive(ArchiveCommand),
}

impl Args {
    /// Run the selected command; `cancel` flips to `true` on Ctrl-C.
    pub async fn run(self, cancel: watch::Receiver<bool>) -> Result<()> {
        match self.command {
            Command::Video(cmd) => cmd.run(cancel).await,
            Command::Paste(cmd) => cmd.run(cancel).await,
            Command::Archive(cmd) => cmd.run(cancel).await,
        }
    }
}
