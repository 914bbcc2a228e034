//! # Request Context
//!
//! Per-request state created on arrival and destroyed on response emission:
//! correlation identity, deadline, and the lifecycle phase used for
//! structured logging. The middleware also emits the latency event for every
//! completed request.

use axum::extract::{Request, State};
use axum::http::header::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::state::AppState;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Lifecycle phase of an inbound request, for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Dispatched,
    CacheLookup,
    CachePending,
    Computing,
    ResponseReady,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Dispatched => write!(f, "dispatched"),
            Self::CacheLookup => write!(f, "cache_lookup"),
            Self::CachePending => write!(f, "cache_pending"),
            Self::Computing => write!(f, "computing"),
            Self::ResponseReady => write!(f, "response_ready"),
        }
    }
}

/// Correlation identity and deadline carried through a request's lifetime
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: Uuid,
    pub started: Instant,
    pub deadline: Instant,
}

impl RequestContext {
    pub fn new(correlation_id: Uuid, budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            correlation_id,
            started,
            deadline: started + budget,
        }
    }

    /// Remaining deadline budget; zero once the deadline has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Record a lifecycle phase against this request
    pub fn enter(&self, phase: RequestPhase) {
        debug!(
            correlation_id = %self.correlation_id,
            phase = %phase,
            "request phase"
        );
    }
}

/// Middleware assigning every request a correlation id and a deadline,
/// echoing the id back on the response, and emitting the latency event.
pub async fn correlation_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .unwrap_or_else(Uuid::new_v4);

    let ctx = RequestContext::new(correlation_id, state.config.web.request_timeout());
    ctx.enter(RequestPhase::Received);

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }

    info!(
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = ctx.started.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_remaining_budget_shrinks_and_saturates() {
        let ctx = RequestContext::new(Uuid::new_v4(), Duration::from_millis(100));
        assert_eq!(ctx.remaining(), Duration::from_millis(100));

        tokio::time::advance(Duration::from_millis(60)).await;
        assert_eq!(ctx.remaining(), Duration::from_millis(40));

        tokio::time::advance(Duration::from_millis(60)).await;
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RequestPhase::CacheLookup.to_string(), "cache_lookup");
        assert_eq!(RequestPhase::ResponseReady.to_string(), "response_ready");
    }
}
