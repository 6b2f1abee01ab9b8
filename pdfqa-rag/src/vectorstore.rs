//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// A storage backend for chunk embeddings with nearest-neighbor search.
///
/// A collection holds chunks of one fixed dimensionality. Upserting a chunk
/// whose embedding length differs is an error, never a silent coercion.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("pdf_documents", 3072).await?;
/// store.upsert("pdf_documents", &chunks).await?;
/// let results = store.nearest_neighbors("pdf_documents", &query_embedding, 10).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists with the same
    /// dimensionality.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace chunks. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Replace a collection's contents with `chunks`, creating it with
    /// `dimensions` if needed.
    ///
    /// The default implementation drops, recreates and upserts in three
    /// steps, so a failed upsert leaves the collection empty. Backends that
    /// can swap atomically override it and keep the old contents on failure.
    async fn replace_collection(
        &self,
        name: &str,
        dimensions: usize,
        chunks: &[Chunk],
    ) -> Result<()> {
        self.delete_collection(name).await?;
        self.create_collection(name, dimensions).await?;
        self.upsert(name, chunks).await
    }

    /// Return the `k` chunks closest to `embedding`, ordered by ascending
    /// distance.
    async fn nearest_neighbors(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Release any held connections. Further calls may fail.
    async fn close(&self) {}

    /// Short backend name used in logs and errors.
    fn backend(&self) -> &str {
        "vector-store"
    }
}

/// Check every chunk embedding against a collection's dimensionality.
pub(crate) fn check_dimensions(chunks: &[Chunk], expected: usize) -> Result<()> {
    match chunks.iter().find(|c| c.embedding.len() != expected) {
        Some(chunk) => {
            Err(RagError::DimensionMismatch { expected, actual: chunk.embedding.len() })
        }
        None => Ok(()),
    }
}

/// Cosine distance (`1 - cosine similarity`).
///
/// Returns `1.0` if either vector has zero magnitude.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
