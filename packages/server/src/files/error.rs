use common::storage::StorageError;
use sea_orm::DbErr;
use thiserror::Error;

/// Errors raised by the file core.
#[derive(Debug, Error)]
pub enum FileError {
    /// An operation violated a file lifecycle rule.
    #[error("{0}")]
    Logic(String),

    /// A blob store failure, passed through untouched.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A required component is not configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No staged file matched the request.
    #[error("File not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
