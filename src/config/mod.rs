//! # Configuration System
//!
//! Explicit, validated configuration loading. Defaults are defined in code,
//! optionally overridden by a TOML file and `CONFLUX_`-prefixed environment
//! variables. There are no silent fallbacks: a configuration that fails
//! validation refuses to boot the process.

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::CircuitBreakerConfig;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluxConfig {
    pub engine: EngineSettings,
    pub cache: CacheSettings,
    pub web: WebSettings,
}

/// Pipeline engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// How long `shutdown` waits for in-flight tasks before cancelling them
    pub shutdown_grace_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: 5_000,
        }
    }
}

impl EngineSettings {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    Redis,
    Memory,
    Noop,
}

/// Cache connection and windowing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    /// Connection string; only meaningful for the redis backend
    pub url: String,
    /// Bound on concurrently in-flight cache operations
    pub pending_window: usize,
    /// TTL applied when a write does not carry its own
    pub default_ttl_seconds: u64,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            url: "redis://localhost:6379/0".to_string(),
            pending_window: 32,
            default_ttl_seconds: 300,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

/// Whether a write handler waits for the cache acknowledgment before
/// responding, or detaches the write and answers immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAckPolicy {
    /// Respond only after the cache acknowledged the write
    Awaited,
    /// Detach the write and respond immediately
    Decoupled,
}

/// Web service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub bind_address: String,
    /// Deadline budget for each inbound request
    pub request_timeout_ms: u64,
    pub write_ack: WriteAckPolicy,
    pub cors_enabled: bool,
    /// Upper bound on keys per batch lookup request
    pub max_lookup_keys: usize,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8282".to_string(),
            request_timeout_ms: 10_000,
            write_ack: WriteAckPolicy::Awaited,
            cors_enabled: false,
            max_lookup_keys: 64,
        }
    }
}

impl WebSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ConfluxConfig {
    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cache.pending_window == 0 {
            return Err(ConfigurationError::Invalid(
                "cache.pending_window must be at least 1".to_string(),
            ));
        }
        if self.web.request_timeout_ms == 0 {
            return Err(ConfigurationError::Invalid(
                "web.request_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.web.max_lookup_keys == 0 {
            return Err(ConfigurationError::Invalid(
                "web.max_lookup_keys must be at least 1".to_string(),
            ));
        }
        if self.cache.backend == CacheBackendKind::Redis && self.cache.url.is_empty() {
            return Err(ConfigurationError::Invalid(
                "cache.url is required for the redis backend".to_string(),
            ));
        }
        Ok(())
    }
}
