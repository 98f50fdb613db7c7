//! Persistence error types.

use jobhub_core::SearchId;
use thiserror::Error;

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The pool could not be created or the path could not be resolved.
    #[error("failed to open database: {0}")]
    Open(String),

    /// An embedded migration failed to apply.
    #[error("migration failed: {0}")]
    Migration(String),

    /// No stored search has this id.
    #[error("search {0} not found")]
    SearchNotFound(SearchId),

    /// A stored column could not be turned back into a domain value.
    #[error("decode error: {0}")]
    Decode(String),

    /// A list column could not be encoded as JSON.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Query or transaction failure reported by `SQLx`.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The database directory could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
