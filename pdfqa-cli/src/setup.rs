//! Wiring of the Gemini, pgvector and PDF components from [`Settings`].

use std::sync::Arc;

use anyhow::{Context, Result};
use pdfqa_rag::gemini::{GeminiChatModel, GeminiClient, GeminiEmbeddingProvider};
use pdfqa_rag::pgvector::PgVectorStore;
use pdfqa_rag::{
    EmbeddingProvider, IngestionPipeline, RagConfig, RagSearch, RecursiveChunker, Settings,
};

/// Pipeline configuration with the settings' context budget applied.
pub fn rag_config(settings: &Settings) -> Result<RagConfig> {
    RagConfig::builder()
        .max_context_chars(settings.max_context_chars)
        .build()
        .context("invalid pipeline configuration")
}

fn gemini_client(settings: &Settings) -> Result<Arc<GeminiClient>> {
    let client = GeminiClient::new(&settings.api_key).context("failed to create Gemini client")?;
    Ok(Arc::new(client))
}

fn embedding_provider(settings: &Settings, client: Arc<GeminiClient>) -> Arc<dyn EmbeddingProvider> {
    Arc::new(
        GeminiEmbeddingProvider::new(client)
            .with_model(&settings.embedding_model)
            .with_dimensions(settings.embedding_dimensions),
    )
}

/// Build the ingestion pipeline, connecting to the database up front.
pub async fn ingestion_pipeline(settings: &Settings, append: bool) -> Result<IngestionPipeline> {
    let config = rag_config(settings)?;
    let client = gemini_client(settings)?;
    let store = PgVectorStore::connect(&settings.database_url)
        .await
        .context("could not connect to the vector database")?;

    IngestionPipeline::builder()
        .chunker(Arc::new(RecursiveChunker::from_config(&config)))
        .embedding_provider(embedding_provider(settings, client))
        .vector_store(Arc::new(store))
        .collection(&settings.collection)
        .append(append)
        .config(config)
        .build()
        .context("failed to build ingestion pipeline")
}

/// Build the answer pipeline. The database is first contacted by
/// [`RagSearch::initialize`].
pub fn search_pipeline(settings: &Settings) -> Result<RagSearch> {
    let config = rag_config(settings)?;
    let client = gemini_client(settings)?;
    let store = PgVectorStore::connect_lazy(&settings.database_url)
        .context("invalid DATABASE_URL")?;

    RagSearch::builder()
        .embedding_provider(embedding_provider(settings, client.clone()))
        .chat_model(Arc::new(GeminiChatModel::new(client).with_model(&settings.chat_model)))
        .vector_store(Arc::new(store))
        .collection(&settings.collection)
        .config(config)
        .build()
        .context("failed to build search pipeline")
}
