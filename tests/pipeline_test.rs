//! End-to-end chat pipeline tests with in-memory collaborators

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use civicrag::config::RetrievalConfig;
use civicrag::errors::CivicRagError;
use civicrag::errors::Result;
use civicrag::models::CommunityPost;
use civicrag::models::NewInteraction;
use civicrag::models::UserInteraction;
use civicrag::rag::ChatModel;
use civicrag::rag::ChatService;
use civicrag::rag::InteractionStore;
use civicrag::rag::TextEmbedder;
use civicrag::rag::FALLBACK_RESPONSE;
use pgvector::Vector;
use uuid::Uuid;

/// In-memory store over a fixed post corpus
struct MemoryStore {
    posts: Vec<CommunityPost>,
    interactions: Mutex<Vec<UserInteraction>>,
    fail_writes: bool,
}

impl MemoryStore {
    fn new(posts: Vec<CommunityPost>) -> Self {
        Self {
            posts,
            interactions: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    fn with_failing_writes(posts: Vec<CommunityPost>) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(posts)
        }
    }

    fn persisted(&self) -> Vec<UserInteraction> {
        self.interactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl InteractionStore for MemoryStore {
    async fn find_recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<UserInteraction>> {
        let interactions = self.interactions.lock().unwrap();
        let mut recent: Vec<UserInteraction> = interactions
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        recent.reverse(); // newest first
        recent.truncate(limit);
        Ok(recent)
    }

    async fn find_embedded_posts(&self) -> Result<Vec<CommunityPost>> {
        Ok(self
            .posts
            .iter()
            .filter(|p| p.embedding_slice().is_some())
            .cloned()
            .collect())
    }

    async fn insert_interaction(&self, record: &NewInteraction) -> Result<()> {
        if self.fail_writes {
            return Err(CivicRagError::Database(sqlx::Error::PoolClosed));
        }
        self.interactions.lock().unwrap().push(UserInteraction {
            id: Uuid::new_v4(),
            user_id: record.user_id.clone(),
            query: record.query.clone(),
            response: record.response.clone(),
            confidence_score: record.confidence_score,
            follow_ups: record.follow_ups.clone(),
            topics: record.topics.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

/// Embedder returning a fixed vector for every input
struct FixedEmbedder(Vec<f32>);

#[async_trait]
impl TextEmbedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Embedder simulating an unreachable embedding model
struct FailingEmbedder;

#[async_trait]
impl TextEmbedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(CivicRagError::EmbeddingUnavailable(
            "connection refused".to_string(),
        ))
    }
}

/// Model returning a scripted reply and capturing the prompts it saw
struct ScriptedModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn seen_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Model simulating an LLM outage
struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(CivicRagError::ModelInvocationFailed(
            "timed out".to_string(),
        ))
    }
}

fn post(content: &str, embedding: Option<Vec<f32>>) -> CommunityPost {
    CommunityPost {
        id: Uuid::new_v4(),
        author: "seed".to_string(),
        title: content.chars().take(40).collect(),
        content: content.to_string(),
        category: "discussion".to_string(),
        topics: vec![],
        embedding: embedding.map(Vector::from),
        created_at: Utc::now(),
    }
}

fn service(
    store: Arc<MemoryStore>,
    embedder: Arc<dyn TextEmbedder>,
    model: Arc<dyn ChatModel>,
) -> ChatService {
    let _ = civicrag::logging::init_simple_logging();
    ChatService::new(store, embedder, model, RetrievalConfig::default())
}

#[tokio::test]
async fn test_query_with_no_matching_posts() {
    // Corpus is orthogonal to the query embedding, nothing clears 0.6
    let store = Arc::new(MemoryStore::new(vec![
        post("unrelated post", Some(vec![0.0, 1.0])),
        post("another unrelated post", Some(vec![0.0, -1.0])),
    ]));
    let model = Arc::new(ScriptedModel::new("I don't have community context on that."));
    let svc = service(
        store.clone(),
        Arc::new(FixedEmbedder(vec![1.0, 0.0])),
        model,
    );

    let answer = svc.handle("u1", "what's new?").await;

    assert_eq!(answer.text, "I don't have community context on that.");
    assert!(answer.retrieved_posts.is_empty());

    // Interaction is still persisted, with the low confidence level
    let persisted = store.persisted();
    assert_eq!(persisted.len(), 1);
    assert!((persisted[0].confidence_score - 0.7).abs() < f64::EPSILON);
    assert_eq!(persisted[0].query, "what's new?");
}

#[tokio::test]
async fn test_query_with_rich_retrieval_gets_high_confidence() {
    let aligned = Some(vec![1.0, 0.0]);
    let store = Arc::new(MemoryStore::new(vec![
        post("Rents rose sharply downtown.", aligned.clone()),
        post("New affordable units were approved.", aligned.clone()),
        post("Tenants formed a housing coalition.", aligned),
    ]));
    let model = Arc::new(ScriptedModel::new(
        "Housing options are expanding, though rent remains high.",
    ));
    let svc = service(
        store.clone(),
        Arc::new(FixedEmbedder(vec![1.0, 0.0])),
        model,
    );

    let answer = svc.handle("u1", "is rent going up?").await;

    assert_eq!(answer.retrieved_posts.len(), 3);
    let persisted = store.persisted();
    assert_eq!(persisted.len(), 1);
    assert!((persisted[0].confidence_score - 0.9).abs() < f64::EPSILON);
    // Topic tags derived from the response text
    assert_eq!(persisted[0].topics, vec!["housing".to_string()]);
    // Rule 3 fires on the query's "rent"
    assert_eq!(
        answer.suggested_questions,
        vec![
            "How is this initiative being funded?".to_string(),
            "Do you need help finding affordable housing?".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_embedding_failure_yields_fallback_and_persists_nothing() {
    let store = Arc::new(MemoryStore::new(vec![post(
        "some post",
        Some(vec![1.0, 0.0]),
    )]));
    let model = Arc::new(ScriptedModel::new("never reached"));
    let svc = service(store.clone(), Arc::new(FailingEmbedder), model.clone());

    let answer = svc.handle("u1", "hello").await;

    assert_eq!(answer.text, FALLBACK_RESPONSE);
    assert!(answer.suggested_questions.is_empty());
    assert!(answer.retrieved_posts.is_empty());
    assert!(store.persisted().is_empty());
    // The model is never invoked on the fallback path
    assert!(model.seen_prompts().is_empty());
}

#[tokio::test]
async fn test_model_failure_yields_fallback_and_persists_nothing() {
    let store = Arc::new(MemoryStore::new(vec![post(
        "some post",
        Some(vec![1.0, 0.0]),
    )]));
    let svc = service(
        store.clone(),
        Arc::new(FixedEmbedder(vec![1.0, 0.0])),
        Arc::new(FailingModel),
    );

    let answer = svc.handle("u1", "hello").await;

    assert_eq!(answer.text, FALLBACK_RESPONSE);
    assert!(answer.suggested_questions.is_empty());
    assert!(answer.retrieved_posts.is_empty());
    assert!(store.persisted().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_is_swallowed() {
    let store = Arc::new(MemoryStore::with_failing_writes(vec![post(
        "a post",
        Some(vec![1.0, 0.0]),
    )]));
    let model = Arc::new(ScriptedModel::new("here you go"));
    let svc = service(
        store.clone(),
        Arc::new(FixedEmbedder(vec![1.0, 0.0])),
        model,
    );

    // The computed answer is still delivered
    let answer = svc.handle("u1", "hello").await;
    assert_eq!(answer.text, "here you go");
    assert_eq!(answer.retrieved_posts.len(), 1);
}

#[tokio::test]
async fn test_prompt_contains_history_and_retrieved_posts() {
    let store = Arc::new(MemoryStore::new(vec![post(
        "The night bus now runs hourly.",
        Some(vec![1.0, 0.0]),
    )]));
    let model = Arc::new(ScriptedModel::new("The schedule changed recently."));
    let svc = service(
        store.clone(),
        Arc::new(FixedEmbedder(vec![1.0, 0.0])),
        model.clone(),
    );

    // First exchange builds up history
    svc.handle("u1", "when does the bus run?").await;
    // Second exchange should carry the first into the prompt
    svc.handle("u1", "and on weekends?").await;

    let prompts = model.seen_prompts();
    assert_eq!(prompts.len(), 2);

    let second = &prompts[1];
    assert!(second.starts_with("User Query: and on weekends?"));
    assert!(second.contains(
        "User asked: \"when does the bus run?\", AI responded: \"The schedule changed recently.\""
    ));
    assert!(second.contains("The night bus now runs hourly."));

    // Section order is fixed
    let query_pos = second.find("User Query:").unwrap();
    let history_pos = second.find("Previous Interactions:").unwrap();
    let posts_pos = second.find("Community Discussions:").unwrap();
    assert!(query_pos < history_pos && history_pos < posts_pos);
}

#[tokio::test]
async fn test_history_window_is_bounded() {
    let store = Arc::new(MemoryStore::new(vec![]));
    let model = Arc::new(ScriptedModel::new("ok"));
    let svc = service(
        store.clone(),
        Arc::new(FixedEmbedder(vec![1.0, 0.0])),
        model.clone(),
    );

    for i in 0..5 {
        svc.handle("u1", &format!("question {i}")).await;
    }

    // Default window is 3: the 5th prompt sees questions 1..=3, not 0
    let prompts = model.seen_prompts();
    let last = prompts.last().unwrap();
    assert!(last.contains("User asked: \"question 3\""));
    assert!(last.contains("User asked: \"question 2\""));
    assert!(last.contains("User asked: \"question 1\""));
    assert!(!last.contains("User asked: \"question 0\""));
}

#[tokio::test]
async fn test_retrieval_respects_top_k_policy() {
    let posts: Vec<CommunityPost> = (0..10)
        .map(|i| post(&format!("post {i}"), Some(vec![1.0, i as f32 * 0.01])))
        .collect();
    let store = Arc::new(MemoryStore::new(posts));
    let model = Arc::new(ScriptedModel::new("ok"));

    let policy = RetrievalConfig {
        top_k: 2,
        ..RetrievalConfig::default()
    };
    let svc = ChatService::new(
        store,
        Arc::new(FixedEmbedder(vec![1.0, 0.0])),
        model,
        policy,
    );

    let answer = svc.handle("u1", "anything").await;
    assert_eq!(answer.retrieved_posts.len(), 2);
    // Best-aligned post first
    assert_eq!(answer.retrieved_posts[0], "post 0");
}
