//! Configuration Loader
//!
//! Environment-aware loading: code defaults, then an optional TOML file
//! (`config/conflux.toml` plus a per-environment override), then
//! `CONFLUX_`-prefixed environment variables. Secrets are redacted before
//! anything is logged.

use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::ConfigResult;
use super::ConfluxConfig;
use crate::cache::providers::redis::redact_url;

/// Loaded configuration plus the environment it was resolved for
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ConfluxConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Self> {
        let environment = Self::detect_environment();
        Self::load_with_env(None, &environment)
    }

    /// Load configuration from an explicit file, bypassing discovery
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let environment = Self::detect_environment();
        Self::load_with_env(Some(path), &environment)
    }

    /// Load configuration with an explicit environment name.
    /// Useful for tests that must not mutate process-wide variables.
    pub fn load_with_env(path: Option<&Path>, environment: &str) -> ConfigResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&ConfluxConfig::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None => {
                for candidate in Self::discovery_candidates(environment) {
                    builder = builder.add_source(
                        File::from(candidate.as_path()).required(false),
                    );
                }
            }
        }

        let merged = builder
            .add_source(Environment::with_prefix("CONFLUX").separator("__"))
            .build()?;
        let config: ConfluxConfig = merged.try_deserialize()?;
        config.validate()?;

        info!(
            environment = environment,
            cache_backend = ?config.cache.backend,
            cache_url = %redact_url(&config.cache.url),
            bind_address = %config.web.bind_address,
            "configuration loaded"
        );

        Ok(Self {
            config,
            environment: environment.to_string(),
        })
    }

    pub fn config(&self) -> &ConfluxConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("CONFLUX_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn discovery_candidates(environment: &str) -> Vec<PathBuf> {
        let base = PathBuf::from("config");
        let candidates = vec![
            base.join("conflux.toml"),
            base.join(format!("conflux.{environment}.toml")),
        ];
        debug!(?candidates, "configuration discovery candidates");
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheBackendKind, WriteAckPolicy};
    use std::io::Write;

    #[test]
    fn test_defaults_when_no_file_present() {
        let manager = ConfigManager::load_with_env(None, "test").unwrap();
        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().cache.backend, CacheBackendKind::Memory);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[cache]
backend = "noop"
pending_window = 4

[web]
bind_address = "0.0.0.0:9090"
write_ack = "decoupled"
"#
        )
        .unwrap();

        let manager = ConfigManager::load_from_file(file.path()).unwrap();
        let config = manager.config();
        assert_eq!(config.cache.backend, CacheBackendKind::Noop);
        assert_eq!(config.cache.pending_window, 4);
        assert_eq!(config.web.bind_address, "0.0.0.0:9090");
        assert_eq!(config.web.write_ack, WriteAckPolicy::Decoupled);
        // Untouched sections keep their defaults
        assert_eq!(config.engine.shutdown_grace_ms, 5_000);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[web]
request_timeout_ms = 0
"#
        )
        .unwrap();

        assert!(ConfigManager::load_from_file(file.path()).is_err());
    }
}
