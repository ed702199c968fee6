//! Educational portal backend: branch/subject catalog, PDF resource library
//! on S3-compatible storage, blog and MCQ quizzes, plus the upload client
//! that talks to it.

pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::DefaultBodyLimit};
use state::AppState;
use tower_http::trace::TraceLayer;

/// Full application router with state, body limit and request tracing.
pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    routes::routes::routes()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
