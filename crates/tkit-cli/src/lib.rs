//! `tkit` command-line front end.

pub mod cli;
pub mod config;
pub mod exit;

pub use cli::Args;
pub use config::EncoderConfig;
