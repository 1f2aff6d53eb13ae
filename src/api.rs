//! Helpers for building the JSON responses shared by all API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Build a JSON error response of the form `{"error": message}`.
pub(crate) fn error_response(status_code: StatusCode, message: &str) -> Response {
    (status_code, Json(serde_json::json!({ "error": message }))).into_response()
}
