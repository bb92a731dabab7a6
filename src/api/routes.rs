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
        // Chat endpoint
        .route("/chat/query", post(handlers::chat_query))
        // Interaction history
        .route("/interactions/:user_id", get(handlers::get_interactions))
        .with_state(state)
}
