//! Deterministic providers and stores shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pdfqa_rag::{
    Chunk, ChatModel, EmbeddingProvider, GenerationOptions, REFUSAL, RagError, Result,
    SearchResult, VectorStore,
};

/// Hash-based embeddings: identical text gives identical vectors, different
/// text gives different directions.
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

pub fn hash_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let mut emb: Vec<f32> = (0..dimensions as u64)
        .map(|i| {
            // splitmix64 step so every component gets its own well-spread value
            let mut z = hash.wrapping_add((i + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^= z >> 31;
            (z >> 40) as f32 / (1u64 << 23) as f32 - 1.0
        })
        .collect();
    let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        emb.iter_mut().for_each(|x| *x /= norm);
    }
    emb
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text, self.dimensions))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Fails for every text containing `marker`, embeds the rest by hash.
pub struct FlakyEmbeddingProvider {
    pub dimensions: usize,
    pub marker: String,
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(&self.marker) {
            return Err(RagError::EmbeddingError {
                provider: "flaky".to_string(),
                message: "simulated outage".to_string(),
            });
        }
        Ok(hash_embedding(text, self.dimensions))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Returns vectors one element longer than it claims.
pub struct WrongDimensionProvider {
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for WrongDimensionProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text, self.dimensions + 1))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Records the highest number of requests in flight at once.
pub struct ConcurrencyProbe {
    pub dimensions: usize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, in_flight: AtomicUsize::new(0), max_in_flight: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for ConcurrencyProbe {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(hash_embedding(text, self.dimensions))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Answers only when the context mentions one of the question's key terms,
/// otherwise returns the refusal. Records every prompt it receives.
pub struct GroundedChatModel {
    pub prompts: Mutex<Vec<(String, GenerationOptions)>>,
}

impl GroundedChatModel {
    pub fn new() -> Self {
        Self { prompts: Mutex::new(Vec::new()) }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().map(|(p, _)| p.clone())
    }
}

fn section<'a>(prompt: &'a str, header: &str, next: &str) -> &'a str {
    let start = prompt.find(header).map(|i| i + header.len()).unwrap_or(0);
    let rest = &prompt[start..];
    let end = rest.find(next).unwrap_or(rest.len());
    &rest[..end]
}

#[async_trait]
impl ChatModel for GroundedChatModel {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        self.prompts.lock().unwrap().push((prompt.to_string(), options));

        let context = section(prompt, "CONTEXT PROVIDED:", "CRITICAL INSTRUCTIONS:").to_lowercase();
        let question = section(prompt, "USER QUESTION:", "ANSWER").to_lowercase();
        let grounded = question
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.chars().count() >= 6)
            .any(|word| context.contains(word));

        if grounded {
            Ok("  The context answers this.  \n".to_string())
        } else {
            Ok(format!("\n{REFUSAL}\n"))
        }
    }
}

/// Always fails to generate.
pub struct BrokenChatModel;

#[async_trait]
impl ChatModel for BrokenChatModel {
    async fn generate(&self, _prompt: &str, _options: GenerationOptions) -> Result<String> {
        Err(RagError::GenerationError {
            provider: "broken".to_string(),
            message: "model unavailable".to_string(),
        })
    }
}

fn unreachable() -> RagError {
    RagError::VectorStoreError {
        backend: "unreachable".to_string(),
        message: "connection refused".to_string(),
    }
}

/// A store that cannot be reached at all.
pub struct UnreachableStore;

#[async_trait]
impl VectorStore for UnreachableStore {
    async fn create_collection(&self, _name: &str, _dimensions: usize) -> Result<()> {
        Err(unreachable())
    }

    async fn delete_collection(&self, _name: &str) -> Result<()> {
        Err(unreachable())
    }

    async fn upsert(&self, _collection: &str, _chunks: &[Chunk]) -> Result<()> {
        Err(unreachable())
    }

    async fn nearest_neighbors(
        &self,
        _collection: &str,
        _embedding: &[f32],
        _k: usize,
    ) -> Result<Vec<SearchResult>> {
        Err(unreachable())
    }
}

/// A store that initialises but loses its connection before searching.
pub struct DroppedConnectionStore;

#[async_trait]
impl VectorStore for DroppedConnectionStore {
    async fn create_collection(&self, _name: &str, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn delete_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, _collection: &str, _chunks: &[Chunk]) -> Result<()> {
        Err(unreachable())
    }

    async fn nearest_neighbors(
        &self,
        _collection: &str,
        _embedding: &[f32],
        _k: usize,
    ) -> Result<Vec<SearchResult>> {
        Err(unreachable())
    }
}

/// Three pages of company-profile prose, none of which mentions revenue.
pub fn company_profile_pages() -> Vec<String> {
    let page = |topic: &str, paragraphs: usize| -> String {
        (1..=paragraphs)
            .map(|n| {
                format!(
                    "Section {n} about {topic}. The organisation documents its {topic} practices \
                     in detail, covering responsibilities, schedules and review cycles. Every \
                     team keeps written records so that audits can trace each decision back to \
                     its owner. Paragraph {n} closes with a summary of open items for {topic}."
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    vec![page("workplace safety", 5), page("office locations", 5), page("training", 5)]
}
