//! # Reactive Cache-Backed Service
//!
//! HTTP front of the system. Handlers dispatch their cache work through the
//! pipeline engine so the event loop never blocks on a round-trip, and every
//! internal failure kind maps to a response status category without leaking
//! cause detail to clients.
//!
//! - [`state`] - shared application state
//! - [`context`] - correlation ids, deadlines and latency telemetry
//! - [`errors`] - failure-to-status mapping
//! - [`handlers`] - entry CRUD, batched lookup, health probes

pub mod context;
pub mod errors;
pub mod handlers;
pub mod state;

pub use context::{RequestContext, RequestPhase};
pub use errors::{ApiError, ApiResult};
pub use state::AppState;

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::future::Future;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ConfluxError, Result};

/// Create API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", post(handlers::entries::create_entry))
        .route("/entries", put(handlers::entries::update_entry))
        .route("/entries/{key}", get(handlers::entries::read_entry))
        .route("/entries/{key}", delete(handlers::entries::delete_entry))
        .route("/entries/lookup", post(handlers::entries::lookup_entries))
}

/// Create health routes
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::basic_health))
        .route("/health/ready", get(handlers::health::readiness_probe))
}

/// Assemble the full router with middleware layers applied
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(health_routes())
        .nest("/v1", api_v1_routes())
        .fallback(handlers::route_fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            context::correlation_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    if state.config.web.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

/// Bind, serve until `shutdown` resolves, then drain.
///
/// Teardown order: stop accepting connections, let axum drain in-flight
/// requests, then drain the pipeline engine within its grace period. The
/// cache pool closes when the state is dropped.
pub async fn serve<S>(state: AppState, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let bind_address = state.config.web.bind_address.clone();
    let grace = state.config.engine.shutdown_grace();
    let engine = state.engine.clone();

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| ConfluxError::Server(format!("failed to bind {bind_address}: {e}")))?;
    info!(bind_address = %bind_address, "🚀 server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ConfluxError::Server(e.to_string()))?;

    engine.shutdown(grace).await;
    info!("server stopped");
    Ok(())
}
