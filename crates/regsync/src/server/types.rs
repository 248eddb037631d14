//! Shared response types for the API boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// JSON error envelope for failed API calls.
pub struct ApiErrorType {
    status: StatusCode,
    message: &'static str,
    detail: Option<String>,
}

impl From<(StatusCode, &'static str)> for ApiErrorType {
    fn from((status, message): (StatusCode, &'static str)) -> Self {
        Self {
            status,
            message,
            detail: None,
        }
    }
}

impl From<(StatusCode, &'static str, Option<String>)> for ApiErrorType {
    fn from((status, message, detail): (StatusCode, &'static str, Option<String>)) -> Self {
        Self {
            status,
            message,
            detail,
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.message,
                "detail": self.detail,
            })),
        )
            .into_response()
    }
}
