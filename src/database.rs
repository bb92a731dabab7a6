use async_trait::async_trait;
use pgvector::Vector;
use sqlx::PgPool;

use crate::models::CommunityPost;
use crate::models::NewCommunityPost;
use crate::models::NewInteraction;
use crate::models::UserInteraction;
use crate::rag::InteractionStore;
use crate::Result;

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new database instance from configuration
    pub async fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections())
            .min_connections(config.min_connections())
            .acquire_timeout(std::time::Duration::from_secs(config.connection_timeout()));

        let pool = pool_options.connect(config.database_url()).await?;
        Ok(Self::new(pool))
    }

    /// Get a reference to the database pool for raw queries
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Initialize database schema
    pub async fn init_schema(&self, embedding_dimension: usize) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS community_posts (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                author VARCHAR(255) NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                category VARCHAR(32) NOT NULL,
                topics TEXT[] NOT NULL DEFAULT '{{}}',
                embedding vector({embedding_dimension}),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_interactions (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id VARCHAR(255) NOT NULL,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                confidence_score DOUBLE PRECISION NOT NULL DEFAULT 0.75,
                follow_ups TEXT[] NOT NULL DEFAULT '{}',
                topics TEXT[] NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Recency lookups are always per user, newest first
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_interactions_user_created
             ON user_interactions (user_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_created
             ON community_posts (created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new community post with its ingestion-time embedding
    pub async fn insert_post(
        &self,
        post: &NewCommunityPost,
        embedding: Vec<f32>,
    ) -> Result<CommunityPost> {
        let row = sqlx::query_as::<_, CommunityPost>(
            r"
            INSERT INTO community_posts (author, title, content, category, embedding)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author, title, content, category, topics, embedding, created_at
            ",
        )
        .bind(&post.author)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.category.as_str())
        .bind(Vector::from(embedding))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// List a user's interactions, newest first
    pub async fn list_interactions(&self, user_id: &str, limit: i64) -> Result<Vec<UserInteraction>> {
        let rows = sqlx::query_as::<_, UserInteraction>(
            r"
            SELECT id, user_id, query, response, confidence_score, follow_ups, topics, created_at
            FROM user_interactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl InteractionStore for Database {
    async fn find_recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<UserInteraction>> {
        self.list_interactions(user_id, limit as i64).await
    }

    async fn find_embedded_posts(&self) -> Result<Vec<CommunityPost>> {
        let rows = sqlx::query_as::<_, CommunityPost>(
            r"
            SELECT id, author, title, content, category, topics, embedding, created_at
            FROM community_posts
            WHERE embedding IS NOT NULL
            ORDER BY created_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_interaction(&self, record: &NewInteraction) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO user_interactions
                (user_id, query, response, confidence_score, follow_ups, topics)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&record.user_id)
        .bind(&record.query)
        .bind(&record.response)
        .bind(record.confidence_score)
        .bind(&record.follow_ups)
        .bind(&record.topics)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
