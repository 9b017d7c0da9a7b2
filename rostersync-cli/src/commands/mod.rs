pub mod resolve;
pub mod run;
pub mod service;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use rostersync_core::Settings;

/// Flags shared by every subcommand. Each one overrides the settings file.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Settings file (default: <config dir>/rostersync/config.yaml).
    #[arg(long, global = true, env = "ROSTERSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Roster JSON file to watch.
    #[arg(long, global = true, env = "ROSTERSYNC_ROSTER")]
    pub roster: Option<PathBuf>,

    /// Target container name.
    #[arg(long, global = true, env = "ROSTERSYNC_CONTAINER")]
    pub container: Option<String>,

    /// Poll interval in seconds.
    #[arg(long, global = true, env = "ROSTERSYNC_INTERVAL")]
    pub interval: Option<u64>,
}

impl GlobalArgs {
    /// Settings file (or defaults) with the command-line overrides applied.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load_at(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => Settings::load().context("failed to load settings")?,
        };

        if let Some(roster) = &self.roster {
            settings.roster_path = roster.clone();
        }
        if let Some(container) = &self.container {
            settings.container = container.clone();
        }
        if let Some(interval) = self.interval {
            settings.poll_interval_secs = interval;
        }
        settings.validate().context("invalid settings")?;
        Ok(settings)
    }
}
