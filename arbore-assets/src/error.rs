//! Asset loading error types.

use arbore_core::LoadResult;
use thiserror::Error;

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors that can occur while materializing a model.
#[derive(Debug, Error)]
pub enum AssetError {
    /// HTTP layer failed (connection, TLS, body read).
    #[error("Model download failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Model download from {url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Filesystem operation failed.
    #[error("Model file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file extension is not a model format we can read.
    #[error("Unsupported model format: {0}")]
    UnsupportedFormat(String),

    /// The file was read but could not be parsed.
    #[error("Failed to parse model: {0}")]
    Parse(String),

    /// The file parsed but contains nothing placeable.
    #[error("Model has no meshes: {0}")]
    NoMesh(String),

    /// A background task panicked or was aborted.
    #[error("Loader task failed: {0}")]
    Task(String),
}

impl From<AssetError> for LoadResult {
    fn from(err: AssetError) -> Self {
        let detail = err.to_string();
        match err {
            AssetError::UnsupportedFormat(_) | AssetError::NoMesh(_) => Self::UnsupportedAsset(detail),
            AssetError::Parse(_) => Self::ParseError(detail),
            AssetError::Http(_) | AssetError::Status { .. } | AssetError::Io(_) | AssetError::Task(_) => {
                Self::FetchError(detail)
            }
        }
    }
}
