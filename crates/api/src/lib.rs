//! HTTP layer with Axum routes for the ApplyBoost site.
//!
//! This crate provides:
//! - Marketing pages and static assets
//! - Resume and lead form endpoints
//! - JSON error responses

pub mod error;
pub mod routes;

use std::sync::Arc;

use applyboost_core::drive::DriveClient;
use applyboost_core::submission::SubmissionService;
use applyboost_shared::{EmailService, ServerConfig, SiteConfig};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Submission pipeline as wired in production.
pub type Submissions = SubmissionService<EmailService, DriveClient>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline every accepted form goes through.
    pub submissions: Arc<Submissions>,
    /// Public site settings.
    pub site: Arc<SiteConfig>,
}

/// Creates the main application router.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(&server.static_dir))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
