//! Error types for rostersync-sync.

use std::path::PathBuf;

use thiserror::Error;

use rostersync_core::error::RosterError;
use rostersync_renderer::RenderError;

use crate::merger::MergeError;

/// All errors that can arise while reconciling one agent or one pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The roster file could not be loaded.
    #[error("roster error: {0}")]
    Roster(#[from] RosterError),

    /// A local I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The entry's name resolves to the empty agent id.
    #[error("roster entry {name:?} has no usable name")]
    EmptyAgentId { name: String },

    /// A container operation reported failure.
    #[error("{operation} failed for {target}: {detail}")]
    Remote {
        operation: &'static str,
        target: String,
        detail: String,
    },

    /// The shared config document is missing or is not valid JSON.
    #[error("shared config {path} is missing or unreadable")]
    SharedConfigUnavailable { path: String },

    /// The shared config document has an unexpected shape.
    #[error("shared config {path}: {source}")]
    Merge {
        path: String,
        #[source]
        source: MergeError,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Remote`].
pub(crate) fn remote_err(
    operation: &'static str,
    target: impl ToString,
    detail: impl Into<String>,
) -> SyncError {
    SyncError::Remote {
        operation,
        target: target.to_string(),
        detail: detail.into(),
    }
}
