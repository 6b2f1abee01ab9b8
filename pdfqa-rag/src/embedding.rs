//! Embedding providers and order-preserving batched embedding.
//!
//! [`EmbeddingProvider`] is the per-text seam a backend implements.
//! [`BatchEmbedder`] drives a provider over many texts in fixed-size batches
//! and never fails as a whole: a text whose request fails, or whose response
//! holds no vector, is replaced by a zero vector and reported as an
//! [`EmbeddingOutcome::Fallback`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a document text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate an embedding vector for a search query.
    ///
    /// Defaults to [`embed`](EmbeddingProvider::embed). Backends that
    /// distinguish query and document embeddings override it.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text).await
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short provider name used in logs and errors.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Why a text received the zero-vector fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// The remote call failed.
    Request(String),
    /// The remote call returned no vector.
    Empty,
    /// The returned vector had the wrong length.
    DimensionMismatch {
        /// Configured dimensionality.
        expected: usize,
        /// Length actually returned.
        actual: usize,
    },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Request(message) => write!(f, "request failed: {message}"),
            FallbackReason::Empty => write!(f, "no embedding returned"),
            FallbackReason::DimensionMismatch { expected, actual } => {
                write!(f, "expected {expected} dimensions, got {actual}")
            }
        }
    }
}

/// Per-text result of a batched embedding call.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    /// The provider returned a usable vector.
    Embedded(Vec<f32>),
    /// The text was given a zero vector instead.
    Fallback {
        /// A zero vector of the configured dimensionality.
        vector: Vec<f32>,
        /// What went wrong.
        reason: FallbackReason,
    },
}

impl EmbeddingOutcome {
    /// The vector to store or search with.
    pub fn vector(&self) -> &[f32] {
        match self {
            EmbeddingOutcome::Embedded(vector) => vector,
            EmbeddingOutcome::Fallback { vector, .. } => vector,
        }
    }

    /// Consume the outcome, keeping only the vector.
    pub fn into_vector(self) -> Vec<f32> {
        match self {
            EmbeddingOutcome::Embedded(vector) => vector,
            EmbeddingOutcome::Fallback { vector, .. } => vector,
        }
    }

    /// Returns `true` for a zero-vector fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, EmbeddingOutcome::Fallback { .. })
    }

    /// The fallback reason, if any.
    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            EmbeddingOutcome::Embedded(_) => None,
            EmbeddingOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Which provider entry point a batch goes through.
#[derive(Debug, Clone, Copy)]
enum EmbedKind {
    Document,
    Query,
}

/// Embeds many texts through an [`EmbeddingProvider`] in sequential batches.
///
/// Requests inside one batch are issued together; batch `i + 1` starts only
/// after batch `i` has completed. Output order always equals input order.
#[derive(Clone)]
pub struct BatchEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl BatchEmbedder {
    /// Default number of texts per batch.
    pub const DEFAULT_BATCH_SIZE: usize = 10;

    /// Wrap a provider using [`DEFAULT_BATCH_SIZE`](Self::DEFAULT_BATCH_SIZE).
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider, batch_size: Self::DEFAULT_BATCH_SIZE }
    }

    /// Set the batch size. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Dimensionality of every returned vector.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Embed document texts, reporting per-text fallbacks.
    pub async fn embed_documents(&self, texts: &[String]) -> Vec<EmbeddingOutcome> {
        info!(
            provider = self.provider.name(),
            text_count = texts.len(),
            batch_size = self.batch_size,
            "generating embeddings"
        );
        self.run_batches(texts, EmbedKind::Document).await
    }

    /// Embed document texts, returning one vector of the configured length
    /// per input.
    pub async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        self.embed_documents(texts).await.into_iter().map(EmbeddingOutcome::into_vector).collect()
    }

    /// Embed a single search query.
    pub async fn embed_query_outcome(&self, text: &str) -> EmbeddingOutcome {
        let texts = [text.to_string()];
        let mut outcomes = self.run_batches(&texts, EmbedKind::Query).await;
        outcomes.pop().unwrap_or_else(|| self.fallback(FallbackReason::Empty))
    }

    /// Embed a single search query, substituting zeros on failure.
    pub async fn embed_query(&self, text: &str) -> Vec<f32> {
        self.embed_query_outcome(text).await.into_vector()
    }

    async fn run_batches(&self, texts: &[String], kind: EmbedKind) -> Vec<EmbeddingOutcome> {
        let mut outcomes = Vec::with_capacity(texts.len());

        for (index, batch) in texts.chunks(self.batch_size).enumerate() {
            let results = join_all(batch.iter().map(|text| self.embed_one(text, kind))).await;
            let failures = results.iter().filter(|o| o.is_fallback()).count();
            outcomes.extend(results);

            if matches!(kind, EmbedKind::Document) {
                info!(
                    batch = index + 1,
                    batch_len = batch.len(),
                    processed = outcomes.len(),
                    failures,
                    "embedded batch"
                );
            }
        }

        outcomes
    }

    async fn embed_one(&self, text: &str, kind: EmbedKind) -> EmbeddingOutcome {
        let result = match kind {
            EmbedKind::Document => self.provider.embed(text).await,
            EmbedKind::Query => self.provider.embed_query(text).await,
        };

        let expected = self.dimensions();
        let outcome = match result {
            Ok(vector) if vector.is_empty() => self.fallback(FallbackReason::Empty),
            Ok(vector) if vector.len() != expected => self.fallback(
                FallbackReason::DimensionMismatch { expected, actual: vector.len() },
            ),
            Ok(vector) => EmbeddingOutcome::Embedded(vector),
            Err(e) => self.fallback(FallbackReason::Request(e.to_string())),
        };

        if let Some(reason) = outcome.fallback_reason() {
            warn!(
                provider = self.provider.name(),
                text_len = text.chars().count(),
                %reason,
                "embedding failed, substituting zero vector"
            );
        }

        outcome
    }

    fn fallback(&self, reason: FallbackReason) -> EmbeddingOutcome {
        EmbeddingOutcome::Fallback { vector: vec![0.0; self.dimensions()], reason }
    }
}
