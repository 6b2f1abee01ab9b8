//! Data types for documents, chunks, search results, and chat messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A loaded source document, kept as its ordered page-level text segments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Origin of the document, usually a file path.
    pub source: String,
    /// Page-level text segments in reading order.
    pub pages: Vec<String>,
}

impl Document {
    /// Create a document from pre-split page segments.
    pub fn from_pages(source: impl Into<String>, pages: Vec<String>) -> Self {
        Self { source: source.into(), pages }
    }

    /// Create a single-segment document from full text.
    pub fn from_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), pages: vec![text.into()] }
    }

    /// Returns `true` if no segment holds any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.trim().is_empty())
    }
}

/// Metadata persisted alongside every chunk.
///
/// `page` is the 1-based position of the chunk in ingestion order and
/// `total_pages` is the number of chunks produced for the document. Neither
/// is a real PDF page number; `segment` records the source segment instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Origin document path.
    #[serde(default)]
    pub source: String,
    /// 1-based chunk sequence position.
    #[serde(default)]
    pub page: usize,
    /// Chunk count at ingestion time.
    #[serde(default)]
    pub total_pages: usize,
    /// 1-based index of the page segment the chunk was cut from.
    #[serde(default)]
    pub segment: usize,
    /// Any other keys found in stored metadata.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A unit of ingested text with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk, never blank.
    pub content: String,
    /// Provenance metadata.
    pub metadata: ChunkMetadata,
    /// The vector embedding for this chunk's content. Empty until embedded.
    pub embedding: Vec<f32>,
}

/// A retrieved chunk paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The chunk text.
    pub content: String,
    /// The chunk metadata.
    pub metadata: ChunkMetadata,
    /// Distance to the query vector (lower is more similar).
    pub score: f32,
}

/// The author of a [`ChatMessage`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// End-user input.
    User,
    /// Prior model output.
    Assistant,
}

/// A role-tagged piece of text used to build one outbound prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a `system` message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// Create a `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Create an `assistant` message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}
