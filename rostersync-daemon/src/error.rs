use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime and systemd management.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("roster not found at {path}; refusing to start")]
    RosterMissing { path: PathBuf },

    #[error("sync error: {0}")]
    Sync(#[from] rostersync_sync::SyncError),

    #[error("{task} task failed: {detail}")]
    Task { task: &'static str, detail: String },

    #[error("systemd error: {0}")]
    Systemd(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
