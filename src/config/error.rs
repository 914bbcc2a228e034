//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Underlying source could not be read or merged
    #[error("configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    /// Loaded values fail validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
