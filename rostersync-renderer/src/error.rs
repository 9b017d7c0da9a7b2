use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// A workspace document failed to parse or render.
    #[error("workspace template: {0}")]
    Tera(#[from] tera::Error),

    #[error("could not build context for roster entry: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading the template override directory failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
