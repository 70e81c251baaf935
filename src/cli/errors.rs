//! CLI-specific error types
//!
//! Store errors keep their own codes; everything else is a CLI_* code.

use std::io;

use thiserror::Error;

use crate::collection::StoreError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Malformed command-line input
    #[error("{0}")]
    InvalidArgument(String),

    /// Store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON argument did not parse
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CliError::InvalidArgument(msg.into())
    }

    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::InvalidArgument(_) => "CLI_INVALID_ARGUMENT",
            CliError::Store(e) => e.code(),
            CliError::Io(_) => "CLI_IO_ERROR",
            CliError::Json(_) => "CLI_JSON_ERROR",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_code_passes_through() {
        let err: CliError = StoreError::Closed.into();
        assert_eq!(err.code(), "STORE_CLOSED");
        assert_eq!(err.to_string(), "database is closed");
    }

    #[test]
    fn test_json_code() {
        let err: CliError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.code(), "CLI_JSON_ERROR");
    }
}
