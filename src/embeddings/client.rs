//! Embedding API clients for the supported providers

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::CivicRagError;
use crate::errors::Result;
use crate::rag::TextEmbedder;

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Google Generative AI `embedContent` API
    Gemini,
    /// Ollama local embeddings
    Ollama,
}

/// Client for generating embeddings.
///
/// All upstream failures (unreachable endpoint, timeout, error status,
/// missing vector in the response) surface as
/// [`CivicRagError::EmbeddingUnavailable`]; a zero vector is never
/// substituted for a real failure.
#[derive(Debug)]
pub struct EmbeddingClient {
    provider: EmbeddingProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(
        provider: EmbeddingProvider,
        model: String,
        endpoint: String,
        api_key: Option<String>,
        request_timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CivicRagError::Http(e.to_string()))?;

        Ok(Self {
            provider,
            model,
            endpoint,
            api_key,
            client,
        })
    }

    /// Create an embedding client from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = match config.embeddings.provider.as_str() {
            "gemini" => EmbeddingProvider::Gemini,
            "ollama" => EmbeddingProvider::Ollama,
            other => {
                return Err(CivicRagError::Config(format!(
                    "Unknown embedding provider: {other}"
                )))
            }
        };

        Self::new(
            provider,
            config.embeddings.model.clone(),
            config.embeddings.endpoint.clone(),
            config.embeddings.api_key.clone(),
            std::time::Duration::from_secs(config.embeddings.request_timeout),
        )
    }

    /// Generate an embedding for a single text
    ///
    /// # Errors
    /// - API request failures (network errors, timeouts, authentication)
    /// - Invalid API responses (malformed JSON, no vector returned)
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        match self.provider {
            EmbeddingProvider::Gemini => self.generate_gemini(text).await,
            EmbeddingProvider::Ollama => self.generate_ollama(text).await,
        }
    }

    /// Generate embeddings for multiple texts.
    ///
    /// Neither provider exposes a batch endpoint we rely on, so requests
    /// run with bounded concurrency.
    pub async fn generate_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        use futures::stream;
        use futures::stream::StreamExt;

        let concurrency = std::cmp::min(texts.len().max(1), 8);
        let results: Vec<Result<Vec<f32>>> = stream::iter(texts.iter())
            .map(|&text| async move { self.generate(text).await })
            .buffered(concurrency)
            .collect()
            .await;

        let mut embeddings = Vec::with_capacity(results.len());
        for result in results {
            embeddings.push(result?);
        }

        Ok(embeddings)
    }

    /// Generate an embedding using the Gemini `embedContent` API
    async fn generate_gemini(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }

        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiRequest<'a> {
            content: Content<'a>,
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            embedding: Option<GeminiEmbedding>,
        }

        #[derive(Deserialize)]
        struct GeminiEmbedding {
            values: Vec<f32>,
        }

        let api_key = self.api_key.as_ref().ok_or_else(|| {
            CivicRagError::Config("Gemini API key not provided".to_string())
        })?;

        let url = format!(
            "{}/models/{}:embedContent?key={api_key}",
            self.endpoint, self.model
        );
        debug!("Calling Gemini embedContent API for model {}", self.model);

        let request = GeminiRequest {
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CivicRagError::EmbeddingUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CivicRagError::EmbeddingUnavailable(format!(
                "Gemini API error ({status}): {error_text}"
            )));
        }

        let result: GeminiResponse = response.json().await.map_err(|e| {
            CivicRagError::EmbeddingUnavailable(format!("Failed to parse response: {e}"))
        })?;

        result
            .embedding
            .map(|e| e.values)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                CivicRagError::EmbeddingUnavailable("No embedding in response".to_string())
            })
    }

    /// Generate an embedding using the Ollama API
    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CivicRagError::EmbeddingUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CivicRagError::EmbeddingUnavailable(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response.json().await.map_err(|e| {
            CivicRagError::EmbeddingUnavailable(format!("Failed to parse response: {e}"))
        })?;

        if result.embedding.is_empty() {
            return Err(CivicRagError::EmbeddingUnavailable(
                "No embedding in response".to_string(),
            ));
        }

        Ok(result.embedding)
    }
}

#[async_trait]
impl TextEmbedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_config_error() {
        let mut config = AppConfig::default();
        config.embeddings.provider = "word2vec".to_string();
        let err = EmbeddingClient::from_config(&config).unwrap_err();
        assert!(matches!(err, CivicRagError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_embedding_unavailable() {
        let client = EmbeddingClient::new(
            EmbeddingProvider::Ollama,
            "nomic-embed-text".to_string(),
            // Reserved port, nothing listens here
            "http://127.0.0.1:1".to_string(),
            None,
            std::time::Duration::from_millis(200),
        )
        .unwrap();

        let err = client.generate("Hello, world!").await.unwrap_err();
        assert!(matches!(err, CivicRagError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    #[ignore = "Requires API key"]
    async fn test_gemini_embedding() {
        let client = EmbeddingClient::new(
            EmbeddingProvider::Gemini,
            "embedding-001".to_string(),
            "https://generativelanguage.googleapis.com/v1beta".to_string(),
            std::env::var("GEMINI_API_KEY").ok(),
            std::time::Duration::from_secs(30),
        )
        .unwrap();

        let embedding = client.generate("Hello, world!").await.unwrap();
        assert_eq!(embedding.len(), 768);
    }
}
