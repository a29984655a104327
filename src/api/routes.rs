//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers;
use super::handlers::AppState;

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Structured recipe search
        .route("/search", post(handlers::search_recipe))
        // Free-text answer with sources
        .route("/answer", post(handlers::answer_query))
        .with_state(state)
}
