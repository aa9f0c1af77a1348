//! Drive client error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the Drive client and its OAuth handling.
#[derive(Debug, Error)]
pub enum DriveError {
    /// `credentials.json` is missing.
    #[error("credentials file not found: {}", .0.display())]
    CredentialsMissing(PathBuf),

    /// `credentials.json` could not be parsed.
    #[error("invalid credentials file: {0}")]
    InvalidCredentials(String),

    /// No usable token and the interactive flow is not allowed here.
    #[error("not authorized; run drive-auth to create a token")]
    NotAuthorized,

    /// The user declined consent or the callback was malformed.
    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Reading or writing the token file failed.
    #[error("token file error: {0}")]
    TokenFile(String),

    /// Client configuration is unusable.
    #[error("drive configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure.
    #[error("request to Google failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Google answered with an error status.
    #[error("Google API returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// Google answered with something we could not interpret.
    #[error("unexpected response from Google: {0}")]
    UnexpectedResponse(String),
}
