//! Error types for the ledger.

use payline_core::ReplayError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The record to delete is not stored.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The ledger has been closed.
    #[error("storage closed")]
    Closed,

    /// The record does not advance its channel.
    #[error("replay rejected: {0}")]
    Replay(#[from] ReplayError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Map a poisoned lock into a database error.
pub(crate) fn lock_poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
        Some(format!("mutex poisoned: {}", e)),
    ))
}
