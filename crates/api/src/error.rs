//! JSON error responses.

use applyboost_core::intake::IntakeError;
use applyboost_core::submission::SubmissionError;
use applyboost_shared::AppError;
use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Machine-readable code, e.g. `MISSING_EMAIL`.
    pub error: &'static str,
    /// Message safe to show the visitor.
    pub message: String,
}

/// Handler error rendered as [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        Self(AppError::validation(err.code(), err.to_string()))
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        Self(AppError::Internal(err.to_string()))
    }
}

fn malformed(status: StatusCode, detail: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError(AppError::PayloadTooLarge(detail))
    } else {
        ApiError(AppError::validation(
            "MALFORMED_FORM",
            "The form could not be read. Please try again.",
        ))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        malformed(err.status(), err.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        malformed(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = ErrorBody {
            success: false,
            error: self.0.error_code(),
            message: self.0.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
