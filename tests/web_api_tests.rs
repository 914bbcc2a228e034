//! End-to-end router tests against an in-memory cache backend.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use conflux_core::cache::CacheProvider;
use conflux_core::config::{ConfluxConfig, WriteAckPolicy};
use conflux_core::pipeline::PipelineEngine;
use conflux_core::web::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_router(config: ConfluxConfig) -> Router {
    let state = AppState::new(
        PipelineEngine::new(),
        Arc::new(CacheProvider::memory(config.cache.pending_window)),
        Arc::new(config),
    );
    build_router(state)
}

fn default_router() -> Router {
    test_router(ConfluxConfig::default())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let response = default_router()
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn readiness_probe_reports_ready_with_memory_cache() {
    let response = default_router()
        .oneshot(empty_request("GET", "/health/ready"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["cache"]["status"], "healthy");
    assert_eq!(body["info"]["cache_provider"], "memory");
}

#[tokio::test]
async fn create_then_read_round_trip() {
    let router = default_router();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/entries",
            json!({ "key": "orders:1", "value": "pending" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "created");

    let response = router
        .oneshot(empty_request("GET", "/v1/entries/orders:1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["key"], "orders:1");
    assert_eq!(body["value"], "pending");
}

#[tokio::test]
async fn create_on_existing_key_conflicts() {
    let router = default_router();
    let request = json_request(
        "POST",
        "/v1/entries",
        json!({ "key": "k", "value": "v" }),
    );
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = json_request(
        "POST",
        "/v1/entries",
        json!({ "key": "k", "value": "other" }),
    );
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn read_of_missing_key_is_not_found() {
    let response = default_router()
        .oneshot(empty_request("GET", "/v1/entries/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn update_overwrites_existing_value() {
    let router = default_router();
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/entries",
            json!({ "key": "k", "value": "old" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/entries",
            json!({ "key": "k", "value": "new" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(empty_request("GET", "/v1/entries/k"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["value"], "new");
}

#[tokio::test]
async fn delete_removes_the_entry() {
    let router = default_router();
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/entries",
            json!({ "key": "k", "value": "v" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", "/v1/entries/k"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(empty_request("GET", "/v1/entries/k"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lookup_fans_out_and_reports_absent_keys_as_null() {
    let router = default_router();
    for (key, value) in [("a", "1"), ("b", "2")] {
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/entries",
                json!({ "key": key, "value": value }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = router
        .oneshot(json_request(
            "POST",
            "/v1/entries/lookup",
            json!({ "keys": ["a", "b", "absent"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["entries"]["a"], "1");
    assert_eq!(body["entries"]["b"], "2");
    assert_eq!(body["entries"]["absent"], Value::Null);
}

#[tokio::test]
async fn lookup_rejects_empty_and_oversized_batches() {
    let router = default_router();
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/entries/lookup",
            json!({ "keys": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let keys: Vec<String> = (0..65).map(|n| format!("k{n}")).collect();
    let response = router
        .oneshot(json_request(
            "POST",
            "/v1/entries/lookup",
            json!({ "keys": keys }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unmatched_route_is_a_routing_failure() {
    let response = default_router()
        .oneshot(empty_request("GET", "/nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "routing_failure");
}

#[tokio::test]
async fn empty_key_is_rejected() {
    let response = default_router()
        .oneshot(json_request(
            "POST",
            "/v1/entries",
            json!({ "key": "   ", "value": "v" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn decoupled_write_policy_answers_accepted_before_the_ack() {
    let mut config = ConfluxConfig::default();
    config.web.write_ack = WriteAckPolicy::Decoupled;
    let router = test_router(config);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/entries",
            json!({ "key": "k", "value": "v" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "accepted");

    // The detached write still lands.
    tokio::task::yield_now().await;
    let response = router
        .oneshot(empty_request("GET", "/v1/entries/k"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_a_correlation_id() {
    let response = default_router()
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-correlation-id"));
}

#[tokio::test]
async fn provided_correlation_id_is_echoed_back() {
    let id = "3e2f8f6a-9a44-4d0c-8f5e-0d9edc1b2a33";
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header("x-correlation-id", id)
        .body(Body::empty())
        .unwrap();
    let response = default_router().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        &axum::http::HeaderValue::from_static(id)
    );
}
