//! Response envelope shared by every JSON endpoint.
//!
//! Success bodies are `{ "data": T, "meta": { ... } }`, error bodies are
//! `{ "error": { "code", "message" }, "meta": { ... } }`.
//!
//! `meta.version` is this monitor's own API revision. The dashboard is
//! served separately from the monitor and is upgraded on its own schedule,
//! so it compares `meta.version` against the revision it was built for
//! before trusting a payload. Bump [`API_VERSION`] whenever a `data` shape
//! under `/api/v1` changes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

use crate::storage::StorageError;

/// Revision of the `/api/v1` payload shapes.
pub const API_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
    pub version: &'static str,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            version: API_VERSION,
        }
    }
}

/// `{ "data": T, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::default(),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

/// Machine-readable error code; the dashboard switches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    BadRequest,
    /// History storage disabled or not opened
    ServiceUnavailable,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

/// `{ "error": { "code", "message" }, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message: message.into(),
            },
            meta: ResponseMeta::default(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Response {
        Self::new(ErrorCode::NotFound, msg).into_response()
    }

    pub fn bad_request(msg: impl Into<String>) -> Response {
        Self::new(ErrorCode::BadRequest, msg).into_response()
    }

    pub fn internal(msg: impl Into<String>) -> Response {
        Self::new(ErrorCode::Internal, msg).into_response()
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Response {
        Self::new(ErrorCode::ServiceUnavailable, msg).into_response()
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.error.code.status(), axum::Json(self)).into_response()
    }
}

impl From<StorageError> for ApiErrorResponse {
    fn from(e: StorageError) -> Self {
        tracing::warn!(error = %e, "History read failed");
        Self::new(ErrorCode::Internal, format!("Storage error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ok_response_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"status": "Running"}));
        assert_eq!(resp.status(), StatusCode::OK);

        let v = body_json(resp).await;
        assert_eq!(v["data"]["status"], "Running");
        assert_eq!(v["meta"]["version"], API_VERSION);
        assert!(v["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_service_unavailable_shape() {
        let resp = ApiErrorResponse::service_unavailable("storage disabled");
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let v = body_json(resp).await;
        assert_eq!(v["error"]["code"], "SERVICE_UNAVAILABLE");
        assert_eq!(v["error"]["message"], "storage disabled");
        assert_eq!(v["meta"]["version"], API_VERSION);
    }

    #[tokio::test]
    async fn test_storage_error_maps_to_internal() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let resp = ApiErrorResponse::from(StorageError::from(bad)).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let v = body_json(resp).await;
        assert_eq!(v["error"]["code"], "INTERNAL_ERROR");
        assert!(v["error"]["message"].as_str().unwrap().starts_with("Storage error"));
    }
}
