//! # Circuit Breaker
//!
//! Classic three-state circuit breaker: Closed (normal operation), Open
//! (failing fast), and Half-Open (probing recovery). Protects the event loop
//! from piling work onto a collaborator that is already failing.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use tokio::time::Instant;
use tracing::{info, warn};

use super::CircuitBreakerConfig;

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - calls probe whether the collaborator recovered
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            // Default to the safest state
            _ => CircuitState::Open,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation failed and was recorded
    #[error("operation failed: {0}")]
    OperationFailed(E),
}

/// Circuit breaker with atomic state management
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging
    name: String,
    state: AtomicU8,
    config: CircuitBreakerConfig,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    /// Time when the circuit was opened, for recovery timing
    opened_at: parking_lot::Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            open_timeout_seconds = config.open_timeout_seconds,
            "🛡️ circuit breaker initialized"
        );
        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            opened_at: parking_lot::Mutex::new(None),
        }
    }

    /// Current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.should_allow_call() {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        let result = operation().await;
        match &result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        result.map_err(CircuitBreakerError::OperationFailed)
    }

    fn should_allow_call(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at = *self.opened_at.lock();
                match opened_at {
                    Some(opened) if opened.elapsed() >= self.config.open_timeout() => {
                        self.transition_to(CircuitState::HalfOpen);
                        true
                    }
                    Some(_) => false,
                    // Open without a timestamp should not happen; allow the call
                    None => true,
                }
            }
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        match self.state() {
            CircuitState::HalfOpen => {
                let successes = self.consecutive_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.success_threshold {
                    *self.opened_at.lock() = None;
                    self.transition_to(CircuitState::Closed);
                }
            }
            CircuitState::Closed | CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        self.consecutive_successes.store(0, Ordering::Release);
        match self.state() {
            CircuitState::HalfOpen => {
                // Recovery probe failed; back to failing fast
                *self.opened_at.lock() = Some(Instant::now());
                self.transition_to(CircuitState::Open);
            }
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    *self.opened_at.lock() = Some(Instant::now());
                    self.transition_to(CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to(&self, next: CircuitState) {
        let previous = CircuitState::from(self.state.swap(next as u8, Ordering::AcqRel));
        if previous != next {
            self.consecutive_successes.store(0, Ordering::Release);
            match next {
                CircuitState::Open => warn!(
                    component = %self.name,
                    from = %previous,
                    "circuit opened, failing fast"
                ),
                _ => info!(
                    component = %self.name,
                    from = %previous,
                    to = %next,
                    "circuit state changed"
                ),
            }
        }
    }
}
