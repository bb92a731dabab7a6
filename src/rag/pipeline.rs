//! Complete chat pipeline: history -> embed -> rank -> assemble ->
//! generate -> enrich -> persist

use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::config::RetrievalConfig;
use crate::database::Database;
use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::llm::LlmService;
use crate::models::NewInteraction;
use crate::models::UserInteraction;
use crate::rag::ranker;
use crate::rag::ChatModel;
use crate::rag::ContextAssembler;
use crate::rag::InteractionStore;
use crate::rag::ResponseEnricher;
use crate::rag::TextEmbedder;

/// User-facing response when any pipeline step fails
pub const FALLBACK_RESPONSE: &str = "Sorry, something went wrong while processing your request.";

/// Structured answer returned to the transport layer
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub text: String,
    pub suggested_questions: Vec<String>,
    pub retrieved_posts: Vec<String>,
}

impl ChatAnswer {
    fn fallback() -> Self {
        Self {
            text: FALLBACK_RESPONSE.to_string(),
            suggested_questions: Vec::new(),
            retrieved_posts: Vec::new(),
        }
    }
}

/// Top-level chat service orchestrating one query end to end.
///
/// Request-scoped and stateless between requests: no caching of
/// embeddings or rankings, no retries, every external call attempted once.
pub struct ChatService {
    store: Arc<dyn InteractionStore>,
    embedder: Arc<dyn TextEmbedder>,
    model: Arc<dyn ChatModel>,
    assembler: ContextAssembler,
    enricher: ResponseEnricher,
    policy: RetrievalConfig,
}

impl ChatService {
    /// Create a chat service from collaborator implementations
    #[must_use]
    pub fn new(
        store: Arc<dyn InteractionStore>,
        embedder: Arc<dyn TextEmbedder>,
        model: Arc<dyn ChatModel>,
        policy: RetrievalConfig,
    ) -> Self {
        let enricher = ResponseEnricher::new(&policy);
        Self {
            store,
            embedder,
            model,
            assembler: ContextAssembler::new(),
            enricher,
            policy,
        }
    }

    /// Create a chat service wired to production collaborators
    ///
    /// # Errors
    /// - Database connection errors
    /// - Embedding client configuration errors (invalid endpoint, missing key)
    /// - LLM client configuration errors
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let database = Arc::new(Database::from_config(config).await?);
        let embedder = Arc::new(EmbeddingClient::from_config(config)?);
        let model = Arc::new(LlmService::from_config(config)?);
        Ok(Self::new(database, embedder, model, config.retrieval.clone()))
    }

    /// Handle one user query end to end.
    ///
    /// Failures in history lookup, embedding, retrieval or model
    /// invocation are caught here and converted into the fixed fallback
    /// answer; the caller never sees a raw error. No interaction is
    /// persisted on the fallback path.
    pub async fn handle(&self, user_id: &str, query: &str) -> ChatAnswer {
        match self.run(user_id, query).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error during AI query processing: {e}");
                ChatAnswer::fallback()
            }
        }
    }

    async fn run(&self, user_id: &str, query: &str) -> Result<ChatAnswer> {
        info!("Processing chat query for user {user_id}");

        // Step 1: load the user's recent conversation window
        let recent = self
            .store
            .find_recent_interactions(user_id, self.policy.history_window)
            .await?;
        debug!("Loaded {} recent interactions", recent.len());

        // Step 2: embed the query
        let query_embedding = self.embedder.embed(query).await?;

        // Step 3: rank embedded posts against the query
        let posts = self.store.find_embedded_posts().await?;
        let ranked = ranker::rank(
            &query_embedding,
            &posts,
            self.policy.min_score,
            self.policy.top_k,
        );
        let retrieved_posts: Vec<String> = ranked.into_iter().map(|r| r.content).collect();
        debug!("Retrieved {} relevant posts", retrieved_posts.len());

        // Step 4: assemble the augmented prompt
        let prompt = self.assembler.assemble(query, &recent, &retrieved_posts);

        // Step 5: single-shot model invocation
        let response_text = self.model.complete(&prompt).await?;

        // Step 6: enrich the raw model output
        let enrichment = self
            .enricher
            .enrich(query, &response_text, retrieved_posts.len());

        // Step 7: persist the interaction, best effort. The computed
        // answer is returned to the caller even if the write fails.
        let record = NewInteraction {
            user_id: user_id.to_string(),
            query: query.to_string(),
            response: response_text.clone(),
            confidence_score: enrichment.confidence,
            follow_ups: enrichment.follow_ups.clone(),
            topics: enrichment.topics,
        };
        if let Err(e) = self.store.insert_interaction(&record).await {
            warn!("Failed to persist interaction for user {user_id}: {e}");
        }

        info!("Chat query completed for user {user_id}");

        Ok(ChatAnswer {
            text: response_text,
            suggested_questions: enrichment.follow_ups,
            retrieved_posts,
        })
    }

    /// The user's recent interactions for the read-side endpoint
    pub async fn recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<UserInteraction>> {
        self.store.find_recent_interactions(user_id, limit).await
    }

    /// Get the active retrieval policy
    #[must_use]
    pub const fn policy(&self) -> &RetrievalConfig {
        &self.policy
    }
}
