//! Route definitions.

use axum::Router;

use crate::AppState;

pub mod health;
pub mod pages;
pub mod submissions;
pub mod testimonials;

/// Creates the router with all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(pages::routes())
        .merge(submissions::routes())
        .merge(testimonials::routes())
}
