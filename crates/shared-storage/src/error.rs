//! Storage errors.

use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A row violates a uniqueness or integrity constraint.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The backing store failed.
    #[error("Database failure: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl Classified for StorageError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Persistence
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
