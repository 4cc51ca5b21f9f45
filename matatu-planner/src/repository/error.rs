//! Repository error types.

use std::path::PathBuf;

/// Errors from reading or writing transit reference data.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Snapshot file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot JSON could not be parsed
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing store is unavailable
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
