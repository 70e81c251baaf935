//! Storage error types
//!
//! Error codes:
//! - STORE_IO_ERROR (ERROR severity)
//! - STORE_CORRUPT (FATAL severity)

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, collection stays usable
    Error,
    /// Collection unusable until the file is repaired
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Errors raised while reading or writing a collection file
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying read/write/rename failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File content is not a sequence of records
    #[error("corrupt collection file '{}': {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Records could not be serialized
    #[error("failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StorageError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Io(_) | StorageError::Encode(_) => "STORE_IO_ERROR",
            StorageError::Corrupt { .. } => "STORE_CORRUPT",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StorageError::Corrupt { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let io_err = StorageError::from(io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(io_err.code(), "STORE_IO_ERROR");
        assert_eq!(io_err.severity(), Severity::Error);

        let corrupt = StorageError::corrupt("/tmp/notes.json", "not an array");
        assert_eq!(corrupt.code(), "STORE_CORRUPT");
        assert_eq!(corrupt.severity(), Severity::Fatal);
        assert!(corrupt.to_string().contains("not an array"));
    }
}
