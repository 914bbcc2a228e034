//! No-op cache backend: always miss, always succeed.
//!
//! Used when caching is disabled; callers observe a cache that never holds
//! anything rather than an error path.

use std::time::Duration;

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheStore;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpStore;

impl CacheStore for NoOpStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }

    fn is_distributed(&self) -> bool {
        false
    }
}
