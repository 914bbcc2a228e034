//! Cache error types

use thiserror::Error;

use crate::pipeline::TaskFailure;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend cannot be reached, or its circuit is open
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// Cache operation timed out
    #[error("cache operation timed out: {0}")]
    Timeout(String),

    /// Generic backend error
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Failed to serialize or deserialize a cache value
    #[error("cache serialization error: {0}")]
    Serialization(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A cache failure surfaces to pipeline tasks as a typed cause, never as a
/// silently substituted default value.
impl From<CacheError> for TaskFailure {
    fn from(error: CacheError) -> Self {
        TaskFailure::CacheUnavailable(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_becomes_typed_task_failure() {
        let failure = TaskFailure::from(CacheError::Unavailable("connection refused".into()));
        assert!(matches!(
            failure,
            TaskFailure::CacheUnavailable(detail) if detail.contains("connection refused")
        ));
    }
}
