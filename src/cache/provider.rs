//! Cache provider with integrated pending window and circuit breaker
//!
//! Uses enum dispatch for zero-cost backend selection. Every operation first
//! takes a slot in the FIFO pending window, then runs through the circuit
//! breaker when the backend is distributed. Consumers simply use
//! `CacheProvider` and get bounded concurrency and fail-fast behavior.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::errors::{CacheError, CacheResult};
use super::providers::{InMemoryStore, NoOpStore, RedisStore};
use super::traits::CacheStore;
use super::window::PendingWindow;
use crate::config::{CacheBackendKind, CacheSettings};
use crate::resilience::{CircuitBreaker, CircuitBreakerError, CircuitState};

/// Internal cache backend enum for zero-cost dispatch
#[derive(Debug)]
enum CacheBackend {
    Redis(Box<RedisStore>),
    Memory(Box<InMemoryStore>),
    NoOp(NoOpStore),
}

impl CacheBackend {
    fn provider_name(&self) -> &'static str {
        match self {
            Self::Redis(store) => store.provider_name(),
            Self::Memory(store) => store.provider_name(),
            Self::NoOp(store) => store.provider_name(),
        }
    }

    fn is_distributed(&self) -> bool {
        match self {
            Self::Redis(store) => store.is_distributed(),
            Self::Memory(store) => store.is_distributed(),
            Self::NoOp(store) => store.is_distributed(),
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            Self::Redis(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
            Self::NoOp(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match self {
            Self::Redis(store) => store.set(key, value, ttl).await,
            Self::Memory(store) => store.set(key, value, ttl).await,
            Self::NoOp(store) => store.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        match self {
            Self::Redis(store) => store.delete(key).await,
            Self::Memory(store) => store.delete(key).await,
            Self::NoOp(store) => store.delete(key).await,
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match self {
            Self::Redis(store) => store.health_check().await,
            Self::Memory(store) => store.health_check().await,
            Self::NoOp(store) => store.health_check().await,
        }
    }
}

/// Cache facade handed to request handlers.
///
/// Bounds in-flight operations with a FIFO window and guards distributed
/// backends with a circuit breaker. An open circuit surfaces as
/// `CacheError::Unavailable` without touching the backend.
#[derive(Debug)]
pub struct CacheProvider {
    backend: CacheBackend,
    window: PendingWindow,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl CacheProvider {
    /// Build the provider selected by configuration
    pub async fn from_config(settings: &CacheSettings) -> CacheResult<Self> {
        let backend = match settings.backend {
            CacheBackendKind::Redis => {
                CacheBackend::Redis(Box::new(RedisStore::from_config(settings).await?))
            }
            CacheBackendKind::Memory => CacheBackend::Memory(Box::new(InMemoryStore::new())),
            CacheBackendKind::Noop => CacheBackend::NoOp(NoOpStore),
        };
        Ok(Self::assemble(backend, settings))
    }

    /// In-memory provider, mainly for tests and single-node deployments
    pub fn memory(pending_window: usize) -> Self {
        Self {
            backend: CacheBackend::Memory(Box::new(InMemoryStore::new())),
            window: PendingWindow::new(pending_window),
            breaker: None,
        }
    }

    /// Provider that caches nothing
    pub fn noop() -> Self {
        Self {
            backend: CacheBackend::NoOp(NoOpStore),
            window: PendingWindow::new(1),
            breaker: None,
        }
    }

    fn assemble(backend: CacheBackend, settings: &CacheSettings) -> Self {
        let breaker = backend.is_distributed().then(|| {
            Arc::new(CircuitBreaker::new(
                format!("cache-{}", backend.provider_name()),
                settings.circuit_breaker.clone(),
            ))
        });
        info!(
            provider = backend.provider_name(),
            pending_window = settings.pending_window,
            circuit_breaker = breaker.is_some(),
            "cache provider assembled"
        );
        Self {
            backend,
            window: PendingWindow::new(settings.pending_window),
            breaker,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    /// Circuit state, when a breaker guards this backend
    pub fn circuit_state(&self) -> Option<CircuitState> {
        self.breaker.as_ref().map(|breaker| breaker.state())
    }

    pub fn window(&self) -> &PendingWindow {
        &self.window
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let _slot = self.window.acquire().await?;
        self.protected(|| self.backend.get(key)).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let _slot = self.window.acquire().await?;
        self.protected(|| self.backend.set(key, value, ttl)).await
    }

    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        let _slot = self.window.acquire().await?;
        self.protected(|| self.backend.delete(key)).await
    }

    pub async fn health_check(&self) -> CacheResult<bool> {
        let _slot = self.window.acquire().await?;
        self.protected(|| self.backend.health_check()).await
    }

    async fn protected<T, F, Fut>(&self, operation: F) -> CacheResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = CacheResult<T>>,
    {
        match &self.breaker {
            Some(breaker) => breaker.call(operation).await.map_err(|error| match error {
                CircuitBreakerError::CircuitOpen { component } => {
                    CacheError::Unavailable(format!("circuit open for {component}"))
                }
                CircuitBreakerError::OperationFailed(cause) => cause,
            }),
            None => operation().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_provider_round_trip() {
        let provider = CacheProvider::memory(4);
        assert_eq!(provider.provider_name(), "memory");
        assert!(provider.circuit_state().is_none());

        provider.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(provider.get("k").await.unwrap(), Some("v".to_string()));
        assert!(provider.delete("k").await.unwrap());
        assert_eq!(provider.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_noop_provider_never_stores() {
        let provider = CacheProvider::noop();
        provider.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(provider.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_window_slot_released_after_operation() {
        let provider = CacheProvider::memory(1);
        for _ in 0..8 {
            provider.set("k", "v", Duration::from_secs(60)).await.unwrap();
        }
        assert_eq!(provider.window().available(), 1);
    }
}
