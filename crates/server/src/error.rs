//! JSON error responses.

use askstore_core::AppError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{ "success": false, "error": { "code": ..., "message": ... } }`
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"invalid_input"`)
    code: &'static str,
    message: String,
}

/// Application error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// 400 with code `invalid_input`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(AppError::InvalidInput(message.into()))
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self.0);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self.0);
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.0.kind(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
