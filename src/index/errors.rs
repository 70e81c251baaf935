//! Index error types
//!
//! Error codes:
//! - STORE_UNIQUE_INDEX_VIOLATION (REJECT)

use thiserror::Error;

/// Errors raised by index maintenance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// A unique index would map one value to two primary keys
    #[error("unique index on '{field}' already holds value {value} (record {existing})")]
    UniqueViolation {
        field: String,
        value: String,
        existing: String,
    },
}

impl IndexError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::UniqueViolation { .. } => "STORE_UNIQUE_INDEX_VIOLATION",
        }
    }

    /// Field whose index rejected the write
    pub fn field(&self) -> &str {
        match self {
            IndexError::UniqueViolation { field, .. } => field,
        }
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
