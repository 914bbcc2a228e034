//! Bounded retry for asynchronous suppliers.
//!
//! Each attempt is bounded by a per-attempt timeout; attempts that time out
//! are always retried, other failures consult the caller's predicate. The
//! delay between attempts grows by a fixed multiplier.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use super::task::TaskFailure;

/// Retry behavior for [`invoke_with_retry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub retry_count: u32,
    /// Delay before the first retry
    #[serde(with = "duration_millis")]
    pub delay: Duration,
    /// Multiplier applied to the delay after every retry
    pub delay_multiplier: u32,
    /// Budget for each individual attempt
    #[serde(with = "duration_millis")]
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 2,
            delay: Duration::from_millis(200),
            delay_multiplier: 2,
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(retry_count: u32) -> Self {
        Self {
            retry_count,
            delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Invoke `supplier` until it succeeds or the policy is exhausted.
///
/// Timeouts are inherently transient and always retried; any other failure is
/// retried only if `retryable` approves it. Exhaustion returns the last
/// failure unchanged.
pub async fn invoke_with_retry<T, F, Fut, P>(
    mut supplier: F,
    policy: RetryPolicy,
    retryable: P,
) -> Result<T, TaskFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TaskFailure>>,
    P: Fn(&TaskFailure) -> bool,
{
    let mut delay = policy.delay;
    let mut attempt: u32 = 1;
    loop {
        let started = tokio::time::Instant::now();
        let result = match tokio::time::timeout(policy.attempt_timeout, supplier()).await {
            Ok(result) => result,
            Err(_) => Err(TaskFailure::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        };

        let cause = match result {
            Ok(value) => return Ok(value),
            Err(cause) => cause,
        };

        if attempt > policy.retry_count {
            error!(
                retry_count = policy.retry_count,
                cause = %cause,
                "retries exhausted"
            );
            return Err(cause);
        }
        if !(cause.is_timeout() || retryable(&cause)) {
            return Err(cause);
        }

        warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            cause = %cause,
            "error on attempt, will be retried"
        );
        tokio::time::sleep(delay).await;
        delay = delay.saturating_mul(policy.delay_multiplier);
        attempt += 1;
    }
}
