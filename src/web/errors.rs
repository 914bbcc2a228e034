//! # Web API Error Types
//!
//! Maps internal failure kinds to HTTP status categories. Response bodies
//! carry an error code and a generic message only; the full cause is emitted
//! to telemetry with the request's correlation id and never leaks to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use super::context::RequestContext;
use crate::pipeline::TaskFailure;

/// Web API errors with HTTP status code mappings
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    #[error("no route matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("invalid request: {message}")]
    BadRequest { message: String },

    #[error("entry already exists")]
    Conflict,

    #[error("cache temporarily unavailable")]
    CacheUnavailable,

    #[error("deadline exceeded")]
    Timeout,

    #[error("service is shutting down")]
    ShuttingDown,

    #[error("internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Map a task failure to its response category, logging the full cause
    /// against the request's correlation id.
    pub fn from_failure(ctx: &RequestContext, failure: TaskFailure) -> Self {
        error!(
            correlation_id = %ctx.correlation_id,
            kind = failure.kind(),
            cause = %failure,
            "request pipeline failed"
        );
        Self::classify(&failure)
    }

    fn classify(failure: &TaskFailure) -> Self {
        match failure {
            TaskFailure::Timeout { .. } => Self::Timeout,
            TaskFailure::CacheUnavailable(_) => Self::CacheUnavailable,
            TaskFailure::Cancelled => Self::ShuttingDown,
            TaskFailure::Composite(members) => {
                // The most actionable member failure decides the status
                let mut classified = Self::Internal;
                for (_, cause) in members {
                    match Self::classify(cause) {
                        Self::CacheUnavailable => return Self::CacheUnavailable,
                        Self::Timeout => classified = Self::Timeout,
                        _ => {}
                    }
                }
                classified
            }
            TaskFailure::Failed(_) => Self::Internal,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::CacheUnavailable | Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RouteNotFound { .. } => "routing_failure",
            Self::BadRequest { .. } => "bad_request",
            Self::Conflict => "conflict",
            Self::CacheUnavailable => "cache_unavailable",
            Self::ShuttingDown => "shutting_down",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TaskId;

    #[test]
    fn test_status_mappings() {
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::CacheUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_failure_classification() {
        assert!(matches!(
            ApiError::classify(&TaskFailure::Timeout { elapsed_ms: 10 }),
            ApiError::Timeout
        ));
        assert!(matches!(
            ApiError::classify(&TaskFailure::CacheUnavailable("down".into())),
            ApiError::CacheUnavailable
        ));
        assert!(matches!(
            ApiError::classify(&TaskFailure::failed("oops")),
            ApiError::Internal
        ));
    }

    #[test]
    fn test_composite_classification_prefers_cache_unavailable() {
        let composite = TaskFailure::Composite(vec![
            (TaskId(0), TaskFailure::failed("a")),
            (TaskId(1), TaskFailure::Timeout { elapsed_ms: 3 }),
            (TaskId(2), TaskFailure::CacheUnavailable("down".into())),
        ]);
        assert!(matches!(
            ApiError::classify(&composite),
            ApiError::CacheUnavailable
        ));

        let composite = TaskFailure::Composite(vec![
            (TaskId(0), TaskFailure::failed("a")),
            (TaskId(1), TaskFailure::Timeout { elapsed_ms: 3 }),
        ]);
        assert!(matches!(ApiError::classify(&composite), ApiError::Timeout));
    }
}
