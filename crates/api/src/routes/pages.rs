//! Site pages, embedded at compile time.

use axum::{Router, response::Html, routing::get};

use crate::AppState;

const HOME: &str = include_str!("../../templates/home.html");
const GET_STARTED: &str = include_str!("../../templates/get_started.html");
const RESUME_BUILDER: &str = include_str!("../../templates/resume_builder.html");
const LOGIN: &str = include_str!("../../templates/login.html");
const PROFILE: &str = include_str!("../../templates/profile.html");

async fn home() -> Html<&'static str> {
    Html(HOME)
}

async fn get_started() -> Html<&'static str> {
    Html(GET_STARTED)
}

async fn resume_builder() -> Html<&'static str> {
    Html(RESUME_BUILDER)
}

async fn login() -> Html<&'static str> {
    Html(LOGIN)
}

async fn profile() -> Html<&'static str> {
    Html(PROFILE)
}

/// Creates page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/get-started", get(get_started))
        .route("/resume-builder", get(resume_builder))
        .route("/login", get(login))
        .route("/profile", get(profile))
}
