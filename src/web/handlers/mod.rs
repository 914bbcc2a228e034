//! HTTP request handlers

pub mod entries;
pub mod health;

use axum::http::{Method, Uri};
use tracing::warn;

use super::errors::ApiError;

/// Fallback for requests whose route matches no registered handler
pub async fn route_fallback(method: Method, uri: Uri) -> ApiError {
    warn!(method = %method, path = %uri.path(), "unmatched route");
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
