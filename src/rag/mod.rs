//! RAG (Retrieval-Augmented Generation) module
//!
//! This module provides the end-to-end chat pipeline for community
//! engagement queries:
//! - Semantic retrieval over community posts using vector embeddings
//! - Similarity ranking with a relevance threshold
//! - Context assembly from conversation history and retrieved posts
//! - LLM answer generation
//! - Deterministic response enrichment (topic tags, follow-up questions,
//!   confidence scoring)
//!
//! # Examples
//!
//! ```rust,no_run
//! use civicrag::config::AppConfig;
//! use civicrag::rag::ChatService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = ChatService::from_config(&config).await?;
//!
//!     let answer = service.handle("user-42", "Is the new bus route safe at night?").await;
//!     println!("Answer: {}", answer.text);
//!     println!("Follow-ups: {:?}", answer.suggested_questions);
//!
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod enrich;
pub mod pipeline;
pub mod ranker;

pub use context::ContextAssembler;
pub use enrich::Enrichment;
pub use enrich::ResponseEnricher;
pub use pipeline::ChatAnswer;
pub use pipeline::ChatService;
pub use pipeline::FALLBACK_RESPONSE;
pub use ranker::RankedResult;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::CommunityPost;
use crate::models::NewInteraction;
use crate::models::UserInteraction;

/// Persistence collaborator for the chat pipeline.
///
/// Implemented by [`crate::database::Database`] in production and by
/// in-memory fakes in tests.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// The requesting user's most recent interactions, newest first
    async fn find_recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<UserInteraction>>;

    /// All posts that carry a non-empty ingestion-time embedding
    async fn find_embedded_posts(&self) -> Result<Vec<CommunityPost>>;

    /// Append a completed interaction record
    async fn insert_interaction(&self, record: &NewInteraction) -> Result<()>;
}

/// Embedding model collaborator
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Convert free text into a fixed-length vector.
    ///
    /// The dimensionality must match the corpus's stored vectors; that is
    /// a configuration invariant, not validated per call.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Language model collaborator, single-shot (no streaming)
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
