//! Error types for the repository and its bridges.

use opera_chain_client::ChainError;
use thiserror::Error;

/// Errors from the in-process cache.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Serialized entry exceeds the configured entry size.
    #[error("cache entry too large: {size} bytes (max {max})")]
    EntryTooLarge { size: usize, max: usize },

    /// Entity could not be serialized for storage.
    #[error("cache serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Result type for cache writes.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite database error.
    #[error("sqlite error: {0}")]
    Sqlite(String),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A value does not fit the stored column range.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to the query layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The full node could not be reached or answered garbage.
    #[error("node unavailable: {0}")]
    Transport(String),

    /// The node refused a submitted transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

impl From<ChainError> for RepositoryError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::NotFound(what) => RepositoryError::NotFound(what),
            ChainError::Rejected(reason) => RepositoryError::Rejected(reason),
            ChainError::Transport(msg) | ChainError::Decode(msg) => {
                RepositoryError::Transport(msg)
            }
        }
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
