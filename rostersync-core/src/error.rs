//! Error types for rostersync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading the roster file.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The roster file did not exist at the configured path.
    #[error("roster not found at {path}")]
    NotFound { path: PathBuf },

    /// Underlying I/O failure other than a missing file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load: includes file path and line context from serde_json.
    #[error("failed to parse roster at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// All errors that can arise from loading [`crate::config::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value parsed but is unusable (zero interval, relative container path, ...).
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
