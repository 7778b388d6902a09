//! Error types for bucketsync

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bucketsync operations
pub type Result<T> = std::result::Result<T, BucketSyncError>;

/// Tagged failure reported by an object store.
///
/// Every backend maps its native errors onto these three cases so callers
/// can branch on "not found" without inspecting service error codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Service error: {0}")]
    Transient(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Main error type for bucketsync
#[derive(Error, Debug)]
pub enum BucketSyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Local directory '{}' is not accessible: {}", .path.display(), .source)]
    LocalDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid config file: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BucketSyncError {
    /// Check if the error is a remote "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, BucketSyncError::Store(e) if e.is_not_found())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, BucketSyncError::Store(StoreError::Transient(_)))
    }
}
