//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Validation error on client input.
    #[error("Validation error: {message}")]
    Validation {
        /// Machine-readable reason, e.g. `MISSING_EMAIL`.
        code: &'static str,
        /// Human-readable message shown to the visitor.
        message: String,
    },

    /// Request body over the configured limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Creates a validation error with a specific code.
    #[must_use]
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::NotFound(_) => 404,
            Self::ExternalService(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => *code,
            Self::PayloadTooLarge(_) => "FILE_TOO_LARGE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the message that is safe to show to a client.
    ///
    /// Internal and upstream details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::PayloadTooLarge(_) => "The uploaded file is too large".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::ExternalService(_) => "An upstream service failed".to_string(),
            Self::Internal(_) => "An error occurred while processing your submission".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
