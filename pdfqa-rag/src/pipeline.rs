//! Ingestion and question-answering pipelines.
//!
//! [`IngestionPipeline`] runs chunk → embed → store once per document and
//! stops at the first failing stage. [`RagSearch`] owns the store handle for
//! a chat session and answers questions from the stored chunks. Its
//! `generate_answer` and `search_documents` never return errors: failures
//! become fixed strings or empty result lists so an interactive loop can keep
//! going.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfqa_rag::{RagConfig, RagSearch};
//!
//! let search = RagSearch::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .chat_model(Arc::new(chat))
//!     .vector_store(Arc::new(store))
//!     .collection("pdf_documents")
//!     .build()?;
//!
//! search.initialize().await;
//! let answer = search.generate_answer("Qual o faturamento da empresa?").await;
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::chat::{ChatCompletion, ChatModel};
use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{ChatMessage, Document, SearchResult};
use crate::embedding::{BatchEmbedder, EmbeddingProvider, FallbackReason};
use crate::error::{RagError, Result};
use crate::prompt::{INTERNAL_ERROR, REFUSAL, assemble_context, render_prompt};
use crate::settings::DEFAULT_COLLECTION;
use crate::vectorstore::VectorStore;

/// Query sent by [`RagSearch::system_status`] to probe the store.
pub const STATUS_PROBE_QUERY: &str = "test";

const PREVIEW_CHARS: usize = 80;

/// Summary of one successful ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Non-blank page segments in the document.
    pub segment_count: usize,
    /// Chunks written to the store.
    pub chunk_count: usize,
    /// Chunks stored with a zero-vector embedding.
    pub fallback_count: usize,
}

/// Loads one document into a collection: chunk → embed → store.
///
/// Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    chunker: Arc<dyn Chunker>,
    embedder: BatchEmbedder,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    replace: bool,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Name of the target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Chunk, embed and store `document`.
    ///
    /// When the pipeline replaces (the default), the collection is swapped
    /// for one holding only this document's chunks through
    /// [`VectorStore::replace_collection`]. Whether a failed write leaves the
    /// previous contents in place depends on the store: the in-memory and
    /// pgvector stores keep them, the trait's default implementation does
    /// not.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if the document yields no chunks,
    /// [`RagError::DimensionMismatch`] if the provider returned a vector of
    /// the wrong length for any chunk, and the store's error if creating the
    /// collection or upserting fails.
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        let segment_count = document.pages.iter().filter(|p| !p.trim().is_empty()).count();
        info!(source = %document.source, segment_count, "splitting document into chunks");

        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            error!(source = %document.source, "document produced no chunks");
            return Err(RagError::ChunkingError(format!(
                "document '{}' produced no chunks",
                document.source
            )));
        }
        info!(chunk_count = chunks.len(), "document split");

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let outcomes = self.embedder.embed_documents(&texts).await;

        let mut fallback_count = 0;
        for outcome in &outcomes {
            match outcome.fallback_reason() {
                Some(FallbackReason::DimensionMismatch { expected, actual }) => {
                    error!(expected, actual, "embedding dimensionality does not match configuration");
                    return Err(RagError::DimensionMismatch { expected: *expected, actual: *actual });
                }
                Some(_) => fallback_count += 1,
                None => {}
            }
        }
        if fallback_count > 0 {
            warn!(fallback_count, "some chunks were stored with zero-vector embeddings");
        }

        for (chunk, outcome) in chunks.iter_mut().zip(outcomes) {
            chunk.embedding = outcome.into_vector();
        }

        let dimensions = self.embedder.dimensions();
        if self.replace {
            self.vector_store
                .replace_collection(&self.collection, dimensions, &chunks)
                .await
                .map_err(|e| {
                    error!(collection = %self.collection, error = %e, "failed to replace collection");
                    e
                })?;
        } else {
            self.vector_store.create_collection(&self.collection, dimensions).await.map_err(
                |e| {
                    error!(collection = %self.collection, error = %e, "failed to create collection");
                    e
                },
            )?;
            self.vector_store.upsert(&self.collection, &chunks).await.map_err(|e| {
                error!(collection = %self.collection, error = %e, "upsert failed during ingestion");
                e
            })?;
        }

        let report = IngestReport { segment_count, chunk_count: chunks.len(), fallback_count };
        info!(
            collection = %self.collection,
            chunk_count = report.chunk_count,
            fallback_count,
            "ingested document"
        );
        Ok(report)
    }

    /// Release the store connection.
    pub async fn close(&self) {
        self.vector_store.close().await;
    }
}

/// Builder for [`IngestionPipeline`].
///
/// `chunker`, `embedding_provider` and `vector_store` are required.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    collection: Option<String>,
    append: bool,
}

impl IngestionPipelineBuilder {
    /// Set the configuration. Only `embedding_batch_size` is read here.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the collection name. Defaults to `pdf_documents`.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Keep existing rows instead of replacing the collection.
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;
        let provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        Ok(IngestionPipeline {
            chunker,
            embedder: BatchEmbedder::new(provider).with_batch_size(config.embedding_batch_size),
            vector_store,
            collection: self.collection.unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            replace: !self.append,
        })
    }
}

/// Lifecycle of a [`RagSearch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// [`RagSearch::initialize`] has not run, or the pipeline was shut down.
    Uninitialized,
    /// The store is reachable and questions can be answered.
    Ready,
    /// A question is being answered.
    Answering,
    /// Store initialisation failed. Terminal.
    Failed(String),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Uninitialized => write!(f, "uninitialized"),
            PipelineState::Ready => write!(f, "ready"),
            PipelineState::Answering => write!(f, "answering"),
            PipelineState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Coarse stored-chunk signal reported by [`RagSearch::system_status`].
///
/// The store is probed with a single-result search, so only "none" and
/// "at least one" can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkCount {
    /// The probe failed or the pipeline is not initialised.
    Unready,
    /// The collection is reachable but empty.
    Zero,
    /// The collection holds at least one chunk; the exact count is unknown.
    NonZeroUnknown,
}

/// Result of a status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemStatus {
    /// `true` when the probe succeeded and found at least one chunk.
    pub is_ready: bool,
    /// Coarse chunk count.
    pub chunks: ChunkCount,
}

/// Answers questions from the chunks stored in one collection.
///
/// Construct one via [`RagSearch::builder()`], then call
/// [`initialize`](RagSearch::initialize) before asking questions.
pub struct RagSearch {
    config: RagConfig,
    embedder: BatchEmbedder,
    completion: ChatCompletion,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    state: RwLock<PipelineState>,
}

impl RagSearch {
    /// Create a new [`RagSearchBuilder`].
    pub fn builder() -> RagSearchBuilder {
        RagSearchBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Name of the searched collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> PipelineState {
        self.state.read().await.clone()
    }

    /// Connect to the store and make sure the collection exists.
    ///
    /// Moves to [`PipelineState::Ready`] on success and to
    /// [`PipelineState::Failed`] otherwise. A failed pipeline stays failed;
    /// calling this again on a ready pipeline is a no-op.
    pub async fn initialize(&self) -> PipelineState {
        let mut state = self.state.write().await;
        if *state != PipelineState::Uninitialized {
            return state.clone();
        }

        let dimensions = self.embedder.dimensions();
        *state = match self.vector_store.create_collection(&self.collection, dimensions).await {
            Ok(()) => {
                info!(
                    collection = %self.collection,
                    backend = self.vector_store.backend(),
                    "search pipeline ready"
                );
                PipelineState::Ready
            }
            Err(e) => {
                error!(collection = %self.collection, error = %e, "failed to initialise vector store");
                PipelineState::Failed(e.to_string())
            }
        };
        state.clone()
    }

    /// Answer `query` from the stored chunks.
    ///
    /// Returns [`REFUSAL`] when nothing is retrieved and [`INTERNAL_ERROR`]
    /// when the pipeline is not ready or retrieval fails. Never panics or
    /// errors.
    pub async fn generate_answer(&self, query: &str) -> String {
        {
            let mut state = self.state.write().await;
            if *state != PipelineState::Ready {
                warn!(state = %*state, "question received while pipeline is not ready");
                return INTERNAL_ERROR.to_string();
            }
            *state = PipelineState::Answering;
        }

        let answer = match self.answer(query).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "failed to answer question");
                INTERNAL_ERROR.to_string()
            }
        };

        let mut state = self.state.write().await;
        if *state == PipelineState::Answering {
            *state = PipelineState::Ready;
        }
        answer
    }

    async fn answer(&self, query: &str) -> Result<String> {
        let results = self.retrieve(query, self.config.top_k).await?;
        if results.is_empty() {
            info!("no chunks retrieved, refusing");
            return Ok(REFUSAL.to_string());
        }

        for (rank, result) in results.iter().enumerate() {
            debug!(
                rank = rank + 1,
                score = result.score,
                preview = %preview(&result.content),
                "retrieved chunk"
            );
        }

        let context = assemble_context(&results, self.config.max_context_chars);
        info!(
            retrieved = results.len(),
            best_score = results[0].score,
            chunks_used = context.chunks_used,
            truncated = context.truncated,
            context_len = context.char_len(),
            "context assembled"
        );

        let prompt = render_prompt(&context.text, query);
        let messages = [ChatMessage::user(prompt)];
        let answer = self.completion.complete(&messages, self.config.temperature).await;
        Ok(answer.trim().to_string())
    }

    /// Return up to `k` chunks nearest to `query`, by ascending distance.
    ///
    /// Returns an empty list on any failure, which callers cannot tell apart
    /// from a genuine lack of matches.
    pub async fn search_documents(&self, query: &str, k: usize) -> Vec<SearchResult> {
        match self.retrieve(query, k).await {
            Ok(results) => results,
            Err(RagError::NotReady(state)) => {
                warn!(%state, "search requested while pipeline is not ready");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "document search failed");
                Vec::new()
            }
        }
    }

    /// Probe the store with a one-result search.
    pub async fn system_status(&self) -> SystemStatus {
        match self.retrieve(STATUS_PROBE_QUERY, 1).await {
            Ok(results) if results.is_empty() => {
                SystemStatus { is_ready: false, chunks: ChunkCount::Zero }
            }
            Ok(_) => SystemStatus { is_ready: true, chunks: ChunkCount::NonZeroUnknown },
            Err(e) => {
                if !matches!(e, RagError::NotReady(_)) {
                    warn!(error = %e, "status probe failed");
                }
                SystemStatus { is_ready: false, chunks: ChunkCount::Unready }
            }
        }
    }

    /// Release the store connection and return to
    /// [`PipelineState::Uninitialized`].
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        self.vector_store.close().await;
        if !matches!(*state, PipelineState::Failed(_)) {
            *state = PipelineState::Uninitialized;
        }
        info!("search pipeline shut down");
    }

    /// Embed `query` and return up to `k` nearest chunks, by ascending
    /// distance.
    ///
    /// A query embedding failure is not an error: the search runs with the
    /// zero vector instead.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] unless the pipeline is ready or
    /// answering, and the store's error if the search fails.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        {
            let state = self.state.read().await;
            if !matches!(*state, PipelineState::Ready | PipelineState::Answering) {
                return Err(RagError::NotReady(state.to_string()));
            }
        }

        let outcome = self.embedder.embed_query_outcome(query).await;
        if let Some(reason) = outcome.fallback_reason() {
            warn!(%reason, "query embedding failed, searching with zero vector");
        }
        self.vector_store.nearest_neighbors(&self.collection, outcome.vector(), k).await
    }
}

fn preview(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().nth(PREVIEW_CHARS).is_some() {
        preview.push_str("...");
    }
    preview.replace('\n', " ")
}

/// Builder for [`RagSearch`].
///
/// `embedding_provider`, `chat_model` and `vector_store` are required.
#[derive(Default)]
pub struct RagSearchBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chat_model: Option<Arc<dyn ChatModel>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    collection: Option<String>,
}

impl RagSearchBuilder {
    /// Set the configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the chat model.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the collection name. Defaults to `pdf_documents`.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Build the pipeline in [`PipelineState::Uninitialized`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<RagSearch> {
        let config = self.config.unwrap_or_default();
        let provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chat_model = self
            .chat_model
            .ok_or_else(|| RagError::ConfigError("chat_model is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        Ok(RagSearch {
            embedder: BatchEmbedder::new(provider).with_batch_size(config.embedding_batch_size),
            completion: ChatCompletion::new(chat_model)
                .with_max_output_tokens(config.max_output_tokens),
            vector_store,
            collection: self.collection.unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            state: RwLock::new(PipelineState::Uninitialized),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_cut_at_eighty_chars() {
        let long = "a".repeat(100);
        assert_eq!(preview(&long), format!("{}...", "a".repeat(80)));
        assert_eq!(preview("short\ntext"), "short text");
    }

    #[test]
    fn state_display() {
        assert_eq!(PipelineState::Ready.to_string(), "ready");
        assert_eq!(PipelineState::Failed("boom".into()).to_string(), "failed: boom");
    }
}
