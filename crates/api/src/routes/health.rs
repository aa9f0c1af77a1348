//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Spool storage provider.
    pub storage: &'static str,
    /// Whether resumes are archived to Drive.
    pub drive_enabled: bool,
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.submissions.storage().provider_name(),
        drive_enabled: state.submissions.archives_to_drive(),
    })
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
