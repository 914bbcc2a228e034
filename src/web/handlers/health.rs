//! # Health Check Handlers
//!
//! Liveness and readiness endpoints. Readiness checks the cache round-trip
//! and the circuit breaker state; an unhealthy dependency turns the probe
//! into a 503 with per-check detail in the body.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::web::state::AppState;

/// Basic health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    status: String,
    timestamp: String,
    checks: HashMap<String, HealthCheck>,
    info: HealthInfo,
}

/// Individual health check result
#[derive(Serialize)]
pub struct HealthCheck {
    status: String,
    message: Option<String>,
    duration_ms: u64,
}

/// System information for the readiness probe
#[derive(Serialize)]
pub struct HealthInfo {
    version: String,
    cache_provider: String,
    circuit_state: Option<String>,
    active_tasks: usize,
    pending_window_in_flight: usize,
    started_at: String,
}

/// Basic health check endpoint: GET /health
///
/// Returns OK whenever the service is running, even during graceful
/// shutdown.
pub async fn basic_health(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness probe: GET /health/ready
///
/// Indicates whether the service should receive traffic.
pub async fn readiness_probe(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    debug!("performing readiness probe");

    let mut checks = HashMap::new();
    let cache_check = check_cache_health(&state).await;
    let mut healthy = cache_check.status == "healthy";
    checks.insert("cache".to_string(), cache_check);

    if let Some(circuit) = state.cache.circuit_state() {
        let open = circuit == crate::resilience::CircuitState::Open;
        healthy = healthy && !open;
        checks.insert(
            "cache_circuit".to_string(),
            HealthCheck {
                status: if open { "unhealthy" } else { "healthy" }.to_string(),
                message: Some(format!("circuit {circuit}")),
                duration_ms: 0,
            },
        );
    }

    let response = ReadinessResponse {
        status: if healthy { "ready" } else { "not_ready" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
        info: HealthInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            cache_provider: state.cache.provider_name().to_string(),
            circuit_state: state.cache.circuit_state().map(|s| s.to_string()),
            active_tasks: state.engine.active_tasks(),
            pending_window_in_flight: state.cache.window().in_flight(),
            started_at: state.started_at.to_rfc3339(),
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

async fn check_cache_health(state: &AppState) -> HealthCheck {
    let started = Instant::now();
    match state.cache.health_check().await {
        Ok(true) => HealthCheck {
            status: "healthy".to_string(),
            message: None,
            duration_ms: started.elapsed().as_millis() as u64,
        },
        Ok(false) => HealthCheck {
            status: "unhealthy".to_string(),
            message: Some("cache backend reported unhealthy".to_string()),
            duration_ms: started.elapsed().as_millis() as u64,
        },
        Err(error) => HealthCheck {
            status: "unhealthy".to_string(),
            message: Some(error.to_string()),
            duration_ms: started.elapsed().as_millis() as u64,
        },
    }
}
