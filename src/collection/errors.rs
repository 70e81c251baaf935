//! Collection error types
//!
//! Error codes:
//! - STORE_VALIDATION_FAILED (REJECT)
//! - STORE_DUPLICATE_KEY (REJECT)
//! - STORE_PRIMARY_KEY_IMMUTABLE (REJECT)
//! - STORE_UNIQUE_INDEX_VIOLATION (REJECT)
//! - STORE_NOT_FOUND (REJECT)
//! - STORE_CORRUPT (FATAL)
//! - STORE_IO_ERROR (ERROR)
//! - STORE_INVALID_COLLECTION_NAME (REJECT)
//! - STORE_CLOSED (REJECT)
//!
//! Every error is local to the failing operation. Rejections are raised
//! before any state is mutated.

use std::io;

use thiserror::Error;

use crate::index::IndexError;
use crate::schema::ValidationErrors;
use crate::storage::StorageError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by collection and registry operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record failed schema checks
    #[error("validation failed in '{collection}': {errors}")]
    Validation {
        collection: String,
        errors: ValidationErrors,
    },

    /// Create with a primary key already present
    #[error("duplicate primary key {key} in '{collection}'")]
    DuplicateKey { collection: String, key: String },

    /// Update attempted to change the primary key
    #[error("primary key '{field}' of record {key} in '{collection}' is immutable")]
    PrimaryKeyImmutable {
        collection: String,
        field: String,
        key: String,
    },

    /// Two records would share a value on a unique field
    #[error("in '{collection}': {source}")]
    UniqueIndexViolation {
        collection: String,
        #[source]
        source: IndexError,
    },

    /// Update targets a missing record
    #[error("record {key} not found in '{collection}'")]
    NotFound { collection: String, key: String },

    /// Backing file is not a sequence of records
    #[error("collection '{collection}' is corrupt: {reason}")]
    CorruptStore { collection: String, reason: String },

    /// Underlying read/write/rename failure
    #[error("I/O error in '{collection}': {source}")]
    Io {
        collection: String,
        #[source]
        source: io::Error,
    },

    /// Name unusable as a file name
    #[error("invalid collection name '{0}'")]
    InvalidCollectionName(String),

    /// Registry used after close
    #[error("database is closed")]
    Closed,
}

impl StoreError {
    /// Wrap a storage error for the named collection.
    pub fn from_storage(collection: &str, err: StorageError) -> Self {
        match err {
            StorageError::Io(source) => StoreError::Io {
                collection: collection.to_string(),
                source,
            },
            StorageError::Encode(e) => StoreError::Io {
                collection: collection.to_string(),
                source: e.into(),
            },
            StorageError::Corrupt { reason, .. } => StoreError::CorruptStore {
                collection: collection.to_string(),
                reason,
            },
        }
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation { .. } => "STORE_VALIDATION_FAILED",
            StoreError::DuplicateKey { .. } => "STORE_DUPLICATE_KEY",
            StoreError::PrimaryKeyImmutable { .. } => "STORE_PRIMARY_KEY_IMMUTABLE",
            StoreError::UniqueIndexViolation { .. } => "STORE_UNIQUE_INDEX_VIOLATION",
            StoreError::NotFound { .. } => "STORE_NOT_FOUND",
            StoreError::CorruptStore { .. } => "STORE_CORRUPT",
            StoreError::Io { .. } => "STORE_IO_ERROR",
            StoreError::InvalidCollectionName(_) => "STORE_INVALID_COLLECTION_NAME",
            StoreError::Closed => "STORE_CLOSED",
        }
    }

    /// Whether the collection is unusable until its file is repaired
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::CorruptStore { .. })
    }

    /// Failing fields, for validation errors
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            StoreError::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationDetails;

    #[test]
    fn test_storage_errors_map_to_store_kinds() {
        let corrupt = StoreError::from_storage("notes", StorageError::corrupt("notes.json", "bad"));
        assert_eq!(corrupt.code(), "STORE_CORRUPT");
        assert!(corrupt.is_fatal());

        let io_err = StoreError::from_storage(
            "notes",
            StorageError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        );
        assert_eq!(io_err.code(), "STORE_IO_ERROR");
        assert!(!io_err.is_fatal());
    }

    #[test]
    fn test_validation_summary_in_message() {
        let err = StoreError::Validation {
            collection: "users".into(),
            errors: ValidationDetails::missing_field("email").into(),
        };
        assert!(err.to_string().contains("email"));
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_unique_violation_names_field() {
        let err = StoreError::UniqueIndexViolation {
            collection: "users".into(),
            source: IndexError::UniqueViolation {
                field: "email".into(),
                value: "\"a@x.com\"".into(),
                existing: "\"u1\"".into(),
            },
        };
        assert_eq!(err.code(), "STORE_UNIQUE_INDEX_VIOLATION");
        assert!(err.to_string().contains("email"));
    }
}
