//! API request and response types

use serde::Deserialize;
use serde::Serialize;

use crate::rag::ChatAnswer;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Chat query request
#[derive(Debug, Deserialize)]
pub struct ChatQueryRequest {
    pub input: String,
    pub user_id: String,
}

/// Chat query response
#[derive(Debug, Serialize)]
pub struct ChatQueryResponse {
    pub text: String,
    pub suggested_questions: Vec<String>,
    pub retrieved_posts: Vec<String>,
}

impl From<ChatAnswer> for ChatQueryResponse {
    fn from(answer: ChatAnswer) -> Self {
        Self {
            text: answer.text,
            suggested_questions: answer.suggested_questions,
            retrieved_posts: answer.retrieved_posts,
        }
    }
}

/// Interaction listing query parameters
#[derive(Debug, Deserialize)]
pub struct InteractionsQuery {
    #[serde(default = "default_interactions_limit")]
    pub limit: usize,
}

pub fn default_interactions_limit() -> usize {
    10
}
