//! `rostersync run`: the foreground watch loop.

use anyhow::{Context, Result};

use rostersync_daemon::start_blocking;

use super::GlobalArgs;

pub fn run(global: &GlobalArgs) -> Result<()> {
    let settings = global.settings()?;
    start_blocking(settings).context("daemon exited with error")?;
    Ok(())
}
