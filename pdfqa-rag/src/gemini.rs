//! Gemini embedding and chat backends over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chat::{ChatModel, GenerationOptions};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
pub use crate::settings::{DEFAULT_CHAT_MODEL, DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};

/// The default Generative Language API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

const PROVIDER: &str = "Gemini";

/// Thin HTTP client shared by the Gemini embedding and chat backends.
///
/// Authenticates with the `x-goog-api-key` header.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for the public API.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".into()));
        }
        Ok(Self { http: reqwest::Client::new(), api_key, base_url: DEFAULT_BASE_URL.into() })
    }

    /// Point the client at another base URL (a proxy or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Build `{base}models/{model}:{method}`, accepting model names with or
    /// without the `models/` prefix.
    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}{}:{method}", self.base_url, model_path(model))
    }

    async fn post_json<Req: Serialize + Sync, Res: DeserializeOwned>(
        &self,
        url: &str,
        body: &Req,
    ) -> std::result::Result<Res, String> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

fn model_path(model: &str) -> String {
    if model.starts_with("models/") { model.to_string() } else { format!("models/{model}") }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self { role: role.map(str::to_string), parts: vec![Part { text: Some(text.to_string()) }] }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini `embedContent` endpoint.
///
/// Documents are embedded with task type `RETRIEVAL_DOCUMENT` and queries
/// with `RETRIEVAL_QUERY`. The configured dimensionality is requested as the
/// output dimensionality.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::gemini::{GeminiClient, GeminiEmbeddingProvider};
///
/// let client = Arc::new(GeminiClient::new("your-api-key")?);
/// let provider = GeminiEmbeddingProvider::new(client);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: Arc<GeminiClient>,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a provider with the default model and dimensionality.
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client, model: DEFAULT_EMBEDDING_MODEL.into(), dimensions: DEFAULT_DIMENSIONS }
    }

    /// Set the model name (e.g. `text-embedding-004`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensionality.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    async fn request(&self, text: &str, task_type: TaskType) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), ?task_type, "embedding text");

        let request = EmbedContentRequest {
            model: model_path(&self.model),
            content: Content::text(None, text),
            task_type,
            output_dimensionality: Some(self.dimensions),
        };
        let url = self.client.endpoint(&self.model, "embedContent");

        let response: EmbedContentResponse =
            self.client.post_json(&url, &request).await.map_err(|message| {
                error!(provider = PROVIDER, error = %message, "embedding request failed");
                RagError::EmbeddingError { provider: PROVIDER.into(), message }
            })?;

        Ok(response.embedding.map(|e| e.values).unwrap_or_default())
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(text, TaskType::RetrievalDocument).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.request(text, TaskType::RetrievalQuery).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

// ── ChatModel implementation ───────────────────────────────────────

/// A [`ChatModel`] backed by the Gemini `generateContent` endpoint.
pub struct GeminiChatModel {
    client: Arc<GeminiClient>,
    model: String,
}

impl GeminiChatModel {
    /// Create a chat model with the default model name.
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client, model: DEFAULT_CHAT_MODEL.into() }
    }

    /// Set the model name (e.g. `gemini-2.5-pro`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        };
        let url = self.client.endpoint(&self.model, "generateContent");

        let response: GenerateContentResponse =
            self.client.post_json(&url, &request).await.map_err(|message| {
                error!(provider = PROVIDER, error = %message, "generation request failed");
                RagError::GenerationError { provider: PROVIDER.into(), message }
            })?;

        let text = response.text();
        if text.trim().is_empty() {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .or_else(|| response.candidates.first().and_then(|c| c.finish_reason.clone()))
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("empty response ({reason})"),
            });
        }

        debug!(provider = PROVIDER, model = %self.model, response_len = text.len(), "generated");
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
