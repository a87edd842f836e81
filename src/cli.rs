use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::byte_size::humanize_byte_size;
use crate::config::Config;
use crate::podcast::Podcast;

#[derive(Debug, Parser)]
#[command(
    name = "podcast-feed",
    version,
    about = "Prune expired daily episodes and publish the podcast feed"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the feed, cleanup endpoint and episode files over HTTP.
    Serve,
    /// Delete episodes older than the retention window.
    Cleanup,
    /// Write the feed document for the current episodes.
    GenerateFeed,
}

pub fn cleanup(config: &Config) -> Result<()> {
    let podcast = Podcast::new(config)?;
    let report = podcast.cleanup().context("cleanup failed")?;
    println!(
        "Cleanup complete. Deleted {} old episodes ({} freed), {} remaining, {} failed.",
        report.deleted,
        humanize_byte_size(report.freed_bytes),
        report.remaining,
        report.failed
    );
    Ok(())
}

pub fn generate_feed(config: &Config) -> Result<()> {
    let podcast = Podcast::new(config)?;
    let summary = podcast
        .write_feed()
        .context("failed to generate podcast feed")?;
    println!(
        "Feed generated successfully at {} ({} episodes)",
        summary.path.display(),
        summary.episodes
    );
    Ok(())
}
