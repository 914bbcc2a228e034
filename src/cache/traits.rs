//! Cache store trait definition

use super::errors::CacheResult;
use std::time::Duration;

/// Trait defining cache operations
///
/// Implemented by concrete cache backends (Redis, in-memory, no-op).
/// All operations are async and return `CacheResult` for error handling.
pub trait CacheStore: Send + Sync {
    /// Get a value from the cache by key
    ///
    /// Returns `Ok(Some(value))` on cache hit, `Ok(None)` on cache miss.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<String>>> + Send;

    /// Set a value in the cache with a TTL
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Delete a key from the cache; returns whether a key was removed
    fn delete(&self, key: &str) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Check if the cache backend is healthy
    fn health_check(&self) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Name of the cache backend
    fn provider_name(&self) -> &'static str;

    /// Whether state is shared across process instances (network round-trips
    /// involved; circuit breaker protection applies)
    fn is_distributed(&self) -> bool;
}
