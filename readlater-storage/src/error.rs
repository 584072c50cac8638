//! Content store error types.

use readlater_crypto::CryptoError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for content store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in content store operations.
///
/// Crypto failures pass through untouched so a caller can still tell a
/// wrong key (`Crypto(CryptoError::Authentication)`) from a missing record.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("content not found: user {user_id}, article {article_id}")]
    NotFound { user_id: String, article_id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("invalid identifier {0:?}")]
    InvalidId(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means "wrong key or tampered data".
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::Authentication))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
