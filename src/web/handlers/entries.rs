//! # Cache Entry Handlers
//!
//! CRUD over cache entries plus a batched fan-out lookup. Every cache
//! round-trip is dispatched as a pipeline task bounded by the request's
//! remaining deadline; handlers never block the event loop waiting on the
//! cache. Whether writes are acknowledged before responding is a deployment
//! policy (`web.write_ack`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::pipeline::{TaskFailure, TaskHandle};
use crate::web::context::{RequestContext, RequestPhase};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;
use crate::config::WriteAckPolicy;

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct WriteReceipt {
    pub key: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    /// Requested keys mapped to their values; absent keys map to null
    pub entries: HashMap<String, Value>,
}

/// Create an entry: POST /v1/entries
///
/// Fails with 409 when the key already holds a value. The existence check
/// and the write are separate cache round-trips, both dispatched through the
/// pipeline engine.
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<EntryRequest>,
) -> ApiResult<(StatusCode, Json<WriteReceipt>)> {
    validate_key(&body.key)?;
    ctx.enter(RequestPhase::Dispatched);

    ctx.enter(RequestPhase::CacheLookup);
    let existing = {
        let cache = state.cache.clone();
        let key = body.key.clone();
        run_bounded(&state, &ctx, async move {
            cache
                .get(&key)
                .await
                .map(value_or_null)
                .map_err(TaskFailure::from)
        })
        .await?
    };
    if !existing.is_null() {
        return Err(ApiError::Conflict);
    }

    let receipt = write_entry(&state, &ctx, body, "created").await?;
    ctx.enter(RequestPhase::ResponseReady);
    Ok(receipt)
}

/// Read an entry: GET /v1/entries/{key}
pub async fn read_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(key): Path<String>,
) -> ApiResult<Json<EntryResponse>> {
    validate_key(&key)?;
    ctx.enter(RequestPhase::CacheLookup);

    let value = {
        let cache = state.cache.clone();
        let key = key.clone();
        run_bounded(&state, &ctx, async move {
            cache
                .get(&key)
                .await
                .map(value_or_null)
                .map_err(TaskFailure::from)
        })
        .await?
    };

    ctx.enter(RequestPhase::ResponseReady);
    match value.as_ref() {
        Value::String(value) => Ok(Json(EntryResponse {
            key,
            value: value.clone(),
        })),
        _ => Err(ApiError::NotFound),
    }
}

/// Upsert an entry: PUT /v1/entries
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<EntryRequest>,
) -> ApiResult<(StatusCode, Json<WriteReceipt>)> {
    validate_key(&body.key)?;
    ctx.enter(RequestPhase::Dispatched);
    let receipt = write_entry(&state, &ctx, body, "updated").await?;
    ctx.enter(RequestPhase::ResponseReady);
    Ok(receipt)
}

/// Delete an entry: DELETE /v1/entries/{key}
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    validate_key(&key)?;
    ctx.enter(RequestPhase::CachePending);

    let cache = state.cache.clone();
    run_bounded(&state, &ctx, async move {
        cache
            .delete(&key)
            .await
            .map(Value::Bool)
            .map_err(TaskFailure::from)
    })
    .await?;

    ctx.enter(RequestPhase::ResponseReady);
    Ok(StatusCode::NO_CONTENT)
}

/// Batched read: POST /v1/entries/lookup
///
/// Fans one task out per key and recombines with `combine`: every lookup
/// runs to completion and a single failed member fails the whole batch with
/// a composite cause.
pub async fn lookup_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<LookupRequest>,
) -> ApiResult<Json<LookupResponse>> {
    if body.keys.is_empty() {
        return Err(ApiError::bad_request("keys must not be empty"));
    }
    if body.keys.len() > state.config.web.max_lookup_keys {
        return Err(ApiError::bad_request(format!(
            "at most {} keys per lookup",
            state.config.web.max_lookup_keys
        )));
    }
    for key in &body.keys {
        validate_key(key)?;
    }
    ctx.enter(RequestPhase::Dispatched);

    ctx.enter(RequestPhase::CacheLookup);
    let lookups: Vec<TaskHandle> = body
        .keys
        .iter()
        .map(|key| {
            let cache = state.cache.clone();
            let key = key.clone();
            state.engine.submit(async move {
                cache
                    .get(&key)
                    .await
                    .map(value_or_null)
                    .map_err(TaskFailure::from)
            })
        })
        .collect();

    let combined = state.engine.combine(&lookups);
    let bounded = state.engine.with_timeout(&combined, ctx.remaining());
    let values = bounded
        .join()
        .await
        .map_err(|failure| ApiError::from_failure(&ctx, failure))?;

    ctx.enter(RequestPhase::ResponseReady);
    let entries = match values.as_ref() {
        Value::Array(values) => body.keys.into_iter().zip(values.iter().cloned()).collect(),
        _ => HashMap::new(),
    };
    Ok(Json(LookupResponse { entries }))
}

/// Dispatch a cache write per the configured acknowledgment policy.
async fn write_entry(
    state: &AppState,
    ctx: &RequestContext,
    body: EntryRequest,
    status: &'static str,
) -> ApiResult<(StatusCode, Json<WriteReceipt>)> {
    let ttl = body
        .ttl_seconds
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.config.cache.default_ttl());
    let cache = state.cache.clone();
    let key = body.key.clone();
    let value = body.value;
    let write = async move {
        cache
            .set(&key, &value, ttl)
            .await
            .map(|()| Value::Null)
            .map_err(TaskFailure::from)
    };

    match state.config.web.write_ack {
        WriteAckPolicy::Awaited => {
            ctx.enter(RequestPhase::CachePending);
            run_bounded(state, ctx, write).await?;
            Ok((
                status_code_for(status),
                Json(WriteReceipt {
                    key: body.key,
                    status,
                }),
            ))
        }
        WriteAckPolicy::Decoupled => {
            // The write outlives the response; its failure is still observed
            // through a recovery continuation that reports to telemetry.
            let task = state.engine.submit(write);
            let correlation_id = ctx.correlation_id;
            let key = body.key.clone();
            let _ = state.engine.recover(&task, move |failure| async move {
                error!(
                    correlation_id = %correlation_id,
                    key = %key,
                    cause = %failure,
                    "decoupled cache write failed"
                );
                Ok(Value::Null)
            });
            Ok((
                StatusCode::ACCEPTED,
                Json(WriteReceipt {
                    key: body.key,
                    status: "accepted",
                }),
            ))
        }
    }
}

fn status_code_for(status: &str) -> StatusCode {
    match status {
        "created" => StatusCode::CREATED,
        _ => StatusCode::OK,
    }
}

/// Submit `work` as a pipeline task bounded by the request deadline.
async fn run_bounded<F>(state: &AppState, ctx: &RequestContext, work: F) -> ApiResult<Arc<Value>>
where
    F: Future<Output = Result<Value, TaskFailure>> + Send + 'static,
{
    let task = state.engine.submit(work);
    let bounded = state.engine.with_timeout(&task, ctx.remaining());
    bounded
        .join()
        .await
        .map_err(|failure| ApiError::from_failure(ctx, failure))
}

fn value_or_null(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

fn validate_key(key: &str) -> ApiResult<()> {
    if key.trim().is_empty() {
        return Err(ApiError::bad_request("key must not be empty"));
    }
    if key.len() > 512 {
        return Err(ApiError::bad_request("key must be at most 512 bytes"));
    }
    Ok(())
}
