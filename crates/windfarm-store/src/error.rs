//! Result store error types.

use thiserror::Error;

/// Errors that can occur while loading a result file.
///
/// These never escape the store: [`crate::ResultStore::read`] turns them into
/// a `CorruptSource` miss.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Result file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Result file is not valid JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Result file is JSON but not laid out as expected
    #[error("Schema error: {0}")]
    Schema(String),

    /// Result file exceeds the configured size limit
    #[error("Source too large: {bytes} bytes (limit {limit})")]
    Oversized { bytes: u64, limit: u64 },

    /// Blocking load task failed
    #[error("Load task failed: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Join(err.to_string())
    }
}
