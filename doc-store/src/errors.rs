use thiserror::Error;

/// Error taxonomy for `doc-store`: retrieval and indexing never raise on
/// a single-document problem, only configuration/database-open failures
/// are fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous docid `{prefix}` matches {count} documents")]
    AmbiguousDocId { prefix: String, count: usize },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("vector dimension mismatch: table expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
