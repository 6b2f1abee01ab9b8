//! # pdfqa-rag
//!
//! Retrieval-augmented question answering over a single PDF document.
//!
//! ## Overview
//!
//! Ingestion reads the PDF, splits its text into overlapping chunks, embeds
//! them in batches and writes them to a vector store. Answering embeds the
//! question, retrieves the nearest chunks, and asks a chat model to answer
//! strictly from that context, refusing when the context is silent.
//!
//! - [`RecursiveChunker`] splits on paragraph, sentence and word boundaries
//! - [`BatchEmbedder`] embeds in order-preserving batches with per-text
//!   zero-vector fallback
//! - [`VectorStore`] is the storage seam, with [`InMemoryVectorStore`] and
//!   (feature `pgvector`) `PgVectorStore`
//! - [`IngestionPipeline`] and [`RagSearch`] wire the pieces together
//!
//! ## Features
//!
//! | Feature | Enables |
//! |---|---|
//! | `gemini` | Gemini embedding and chat clients |
//! | `pgvector` | PostgreSQL + pgvector store |
//! | `pdf` | PDF text extraction |
//! | `full` | all of the above |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pdfqa_rag::*;
//!
//! let store = Arc::new(InMemoryVectorStore::new());
//! let ingest = IngestionPipeline::builder()
//!     .chunker(Arc::new(RecursiveChunker::new(1000, 200)))
//!     .embedding_provider(embedder.clone())
//!     .vector_store(store.clone())
//!     .build()?;
//! ingest.ingest(&Document::from_text("doc.pdf", text)).await?;
//!
//! let search = RagSearch::builder()
//!     .embedding_provider(embedder)
//!     .chat_model(chat)
//!     .vector_store(store)
//!     .build()?;
//! search.initialize().await;
//! println!("{}", search.generate_answer("What is the revenue?").await);
//! ```

pub mod chat;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod pipeline;
pub mod prompt;
pub mod settings;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "pdf")]
pub mod loader;

#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chat::{ChatCompletion, ChatModel, GENERATION_FALLBACK, GenerationOptions};
pub use chunking::{ChunkSpan, Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{ChatMessage, Chunk, ChunkMetadata, Document, Role, SearchResult};
pub use embedding::{BatchEmbedder, EmbeddingOutcome, EmbeddingProvider, FallbackReason};
pub use error::{RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{
    ChunkCount, IngestReport, IngestionPipeline, IngestionPipelineBuilder, PipelineState,
    RagSearch, RagSearchBuilder, STATUS_PROBE_QUERY, SystemStatus,
};
pub use prompt::{AssembledContext, INTERNAL_ERROR, REFUSAL, assemble_context, render_prompt};
pub use settings::Settings;
pub use vectorstore::{VectorStore, cosine_distance};
