//! # Resilience
//!
//! Fault-isolation primitives protecting calls to external collaborators.

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the circuit again
    pub success_threshold: u32,
    /// How long the circuit stays open before probing recovery
    pub open_timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout_seconds: 30,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_seconds)
    }
}
