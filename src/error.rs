use std::io;

pub type Result<T> = std::result::Result<T, RelayError>;

/// Faults that can surface outside a single module.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not determine the per-user application data directory")]
    NoDataDir,
}
