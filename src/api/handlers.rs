//! API request handlers

use std::sync::Arc;

use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::Json;
use tracing::error;
use tracing::info;

use crate::api::types::ApiResponse;
use crate::api::types::ChatQueryRequest;
use crate::api::types::ChatQueryResponse;
use crate::api::types::HealthResponse;
use crate::api::types::InteractionsQuery;
use crate::models::UserInteraction;
use crate::rag::ChatService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
}

/// Health check
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Chat query.
///
/// Never returns an error status for pipeline failures: the service
/// collapses them into the fixed fallback answer.
pub async fn chat_query(
    State(state): State<AppState>,
    Json(req): Json<ChatQueryRequest>,
) -> Json<ApiResponse<ChatQueryResponse>> {
    info!("POST /api/chat/query from user {}", req.user_id);

    let answer = state.chat_service.handle(&req.user_id, &req.input).await;
    Json(ApiResponse::success(answer.into()))
}

/// List a user's recent interactions, newest first.
///
/// Lookup failures are logged and reported as an empty list.
pub async fn get_interactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<InteractionsQuery>,
) -> Json<ApiResponse<Vec<UserInteraction>>> {
    info!("GET /api/interactions/{user_id}");

    match state
        .chat_service
        .recent_interactions(&user_id, params.limit)
        .await
    {
        Ok(interactions) => Json(ApiResponse::success(interactions)),
        Err(e) => {
            error!("Failed to fetch user interactions: {e}");
            Json(ApiResponse::success(Vec::new()))
        }
    }
}
