//! Language model client for single-shot answer generation

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::CivicRagError;
use crate::errors::Result;
use crate::rag::ChatModel;

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// Google Generative AI `generateContent` API
    Gemini,
    /// OpenAI-compatible chat completions (also covers Ollama)
    OpenAI,
}

/// Client for single-shot completions.
///
/// No streaming and no retries: each request is one attempt with a
/// bounded timeout, and every failure surfaces as
/// [`CivicRagError::ModelInvocationFailed`].
#[derive(Clone, Debug)]
pub struct LlmService {
    provider: LlmProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: usize,
    client: Client,
}

impl LlmService {
    /// Create a new LLM client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(
        provider: LlmProvider,
        model: String,
        endpoint: String,
        api_key: Option<String>,
        max_tokens: usize,
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
            max_tokens,
            client,
        })
    }

    /// Create an LLM client from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = match config.llm.provider.as_str() {
            "gemini" => LlmProvider::Gemini,
            "openai" => LlmProvider::OpenAI,
            other => {
                return Err(CivicRagError::Config(format!(
                    "Unknown LLM provider: {other}"
                )))
            }
        };

        Self::new(
            provider,
            config.llm.model.clone(),
            config.llm.endpoint.clone(),
            config.llm.api_key.clone(),
            config.llm.max_tokens,
            std::time::Duration::from_secs(config.llm.request_timeout),
        )
    }

    /// Generate a completion for the given prompt
    ///
    /// # Errors
    /// - API request failures (network errors, timeouts, authentication)
    /// - Invalid API responses (malformed JSON, empty completion)
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        match self.provider {
            LlmProvider::Gemini => self.generate_gemini(prompt).await,
            LlmProvider::OpenAI => self.generate_openai(prompt).await,
        }
    }

    /// Generate a completion using the Gemini `generateContent` API
    async fn generate_gemini(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }

        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            max_output_tokens: usize,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GeminiRequest<'a> {
            contents: Vec<Content<'a>>,
            generation_config: GenerationConfig,
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            candidates: Option<Vec<Candidate>>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: CandidateContent,
        }

        #[derive(Deserialize)]
        struct CandidateContent {
            parts: Vec<CandidatePart>,
        }

        #[derive(Deserialize)]
        struct CandidatePart {
            text: String,
        }

        let api_key = self.api_key.as_ref().ok_or_else(|| {
            CivicRagError::Config("Gemini API key not provided".to_string())
        })?;

        let url = format!(
            "{}/models/{}:generateContent?key={api_key}",
            self.endpoint, self.model
        );
        debug!("Calling Gemini generateContent API for model {}", self.model);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CivicRagError::ModelInvocationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CivicRagError::ModelInvocationFailed(format!(
                "Gemini API error ({status}): {error_text}"
            )));
        }

        let result: GeminiResponse = response.json().await.map_err(|e| {
            CivicRagError::ModelInvocationFailed(format!("Failed to parse response: {e}"))
        })?;

        result
            .candidates
            .and_then(|mut c| {
                if c.is_empty() {
                    None
                } else {
                    Some(c.remove(0))
                }
            })
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                CivicRagError::ModelInvocationFailed("No completion in response".to_string())
            })
    }

    /// Generate a completion using an OpenAI-compatible chat API
    async fn generate_openai(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
            max_tokens: usize,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {}", url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
        };

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| CivicRagError::ModelInvocationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CivicRagError::ModelInvocationFailed(format!(
                "Chat API error ({status}): {error_text}"
            )));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            CivicRagError::ModelInvocationFailed(format!("Failed to parse response: {e}"))
        })?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                CivicRagError::ModelInvocationFailed("No completion in response".to_string())
            })
    }
}

#[async_trait]
impl ChatModel for LlmService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }
}
