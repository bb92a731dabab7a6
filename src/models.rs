use chrono::DateTime;
use chrono::Utc;
use pgvector::Vector;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Community post categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostCategory {
    News,
    Discussion,
}

impl PostCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            PostCategory::News => "news",
            PostCategory::Discussion => "discussion",
        }
    }
}

impl From<&str> for PostCategory {
    fn from(value: &str) -> Self {
        match value {
            "news" => PostCategory::News,
            _ => PostCategory::Discussion,
        }
    }
}

/// A community post with its ingestion-time embedding.
///
/// Posts are immutable once stored; the embedding is generated exactly
/// once at ingestion and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommunityPost {
    pub id: Uuid,
    pub author: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vector>,
    pub created_at: DateTime<Utc>,
}

impl CommunityPost {
    /// Stored embedding as a plain float slice, if present and non-empty
    pub fn embedding_slice(&self) -> Option<&[f32]> {
        self.embedding
            .as_ref()
            .map(Vector::as_slice)
            .filter(|v| !v.is_empty())
    }
}

/// A recorded user/assistant exchange.
///
/// Append-only: confidence, topics and follow-ups are fixed at the moment
/// the record is written and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserInteraction {
    pub id: Uuid,
    pub user_id: String,
    pub query: String,
    pub response: String,
    pub confidence_score: f64,
    pub follow_ups: Vec<String>,
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for inserting a new interaction record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInteraction {
    pub user_id: String,
    pub query: String,
    pub response: String,
    pub confidence_score: f64,
    pub follow_ups: Vec<String>,
    pub topics: Vec<String>,
}

/// Payload for ingesting a new community post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommunityPost {
    pub author: String,
    pub title: String,
    pub content: String,
    pub category: PostCategory,
}
