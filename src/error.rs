//! Top-level error type for bootstrap and server paths.
//!
//! Domain-specific taxonomies live with their modules: task failures in
//! [`crate::pipeline::TaskFailure`], cache errors in
//! [`crate::cache::CacheError`], HTTP mappings in [`crate::web`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfluxError {
    #[error("configuration error: {0}")]
    Configuration(#[from] crate::config::ConfigurationError),

    #[error("cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("pipeline failure: {0}")]
    Pipeline(#[from] crate::pipeline::TaskFailure),

    #[error("server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, ConfluxError>;
