//! Error types for filedepot.

use std::time::Duration;

use thiserror::Error;

/// Common error type for filedepot.
#[derive(Error, Debug)]
pub enum DepotError {
    /// Database error.
    ///
    /// This is a generic database error that wraps errors from any database
    /// backend. Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (absent, or not owned by the calling account).
    #[error("{0} not found")]
    NotFound(String),

    /// State conflict: duplicate sibling name, cyclic move, non-empty delete.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure: missing, unknown, revoked, or expired key.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Rolling-window quota exhausted for the presented key.
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited {
        /// Time until the oldest counted request ages out of the window.
        retry_after: Duration,
    },

    /// Blob storage failure (transient; safe to retry the whole upload).
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for DepotError {
    fn from(e: sqlx::Error) -> Self {
        DepotError::Database(e.to_string())
    }
}

/// Result type alias for filedepot operations.
pub type Result<T> = std::result::Result<T, DepotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = DepotError::Validation("page must be >= 1".to_string());
        assert_eq!(err.to_string(), "validation error: page must be >= 1");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = DepotError::NotFound("file".to_string());
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_conflict_error_display() {
        let err = DepotError::Conflict("folder name already exists".to_string());
        assert_eq!(err.to_string(), "conflict: folder name already exists");
    }

    #[test]
    fn test_unauthorized_error_display() {
        let err = DepotError::Unauthorized("key revoked".to_string());
        assert_eq!(err.to_string(), "unauthorized: key revoked");
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let err = DepotError::RateLimited {
            retry_after: Duration::from_secs(120),
        };
        match err {
            DepotError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(120));
            }
            _ => panic!("expected RateLimited"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "blob missing");
        let err: DepotError = io_err.into();
        assert!(matches!(err, DepotError::Io(_)));
        assert!(err.to_string().contains("blob missing"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(DepotError::Storage("disk full".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
