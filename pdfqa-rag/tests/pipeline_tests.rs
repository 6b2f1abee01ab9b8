//! End-to-end tests for ingestion and question answering against the
//! in-memory store.

mod common;

use std::sync::Arc;

use common::*;
use pdfqa_rag::{
    ChunkCount, Document, INTERNAL_ERROR, IngestionPipeline, InMemoryVectorStore, PipelineState,
    REFUSAL, RagConfig, RagError, RagSearch, RecursiveChunker, VectorStore,
};

const DIM: usize = 32;
const COLLECTION: &str = "pdf_documents";

fn ingestion(
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn pdfqa_rag::EmbeddingProvider>,
) -> IngestionPipeline {
    IngestionPipeline::builder()
        .chunker(Arc::new(RecursiveChunker::new(1000, 200)))
        .embedding_provider(provider)
        .vector_store(store)
        .collection(COLLECTION)
        .build()
        .unwrap()
}

fn search(store: Arc<dyn VectorStore>, chat: Arc<dyn pdfqa_rag::ChatModel>) -> RagSearch {
    RagSearch::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .chat_model(chat)
        .vector_store(store)
        .collection(COLLECTION)
        .build()
        .unwrap()
}

async fn ingest_profile(store: &Arc<InMemoryVectorStore>) -> Vec<String> {
    let document = Document::from_pages("company.pdf", company_profile_pages());
    let pipeline = ingestion(store.clone(), Arc::new(HashEmbeddingProvider::new(DIM)));
    let report = pipeline.ingest(&document).await.unwrap();
    assert_eq!(report.segment_count, 3);
    assert_eq!(report.fallback_count, 0);

    RecursiveChunker::new(1000, 200)
        .split_text(&document.pages[0])
        .into_iter()
        .chain(RecursiveChunker::new(1000, 200).split_text(&document.pages[1]))
        .chain(RecursiveChunker::new(1000, 200).split_text(&document.pages[2]))
        .collect()
}

#[tokio::test]
async fn ingest_stores_every_chunk() {
    let store = Arc::new(InMemoryVectorStore::new());
    let contents = ingest_profile(&store).await;
    assert!(contents.len() >= 6, "expected several chunks, got {}", contents.len());
    assert_eq!(store.count(COLLECTION).await, Some(contents.len()));
}

#[tokio::test]
async fn reingest_replaces_collection_unless_appending() {
    let store = Arc::new(InMemoryVectorStore::new());
    let document = Document::from_text("small.pdf", "A single short paragraph.");

    let pipeline = ingestion(store.clone(), Arc::new(HashEmbeddingProvider::new(DIM)));
    pipeline.ingest(&document).await.unwrap();
    pipeline.ingest(&document).await.unwrap();
    assert_eq!(store.count(COLLECTION).await, Some(1));

    let appending = IngestionPipeline::builder()
        .chunker(Arc::new(RecursiveChunker::new(1000, 200)))
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .vector_store(store.clone())
        .collection(COLLECTION)
        .append(true)
        .build()
        .unwrap();
    appending.ingest(&document).await.unwrap();
    assert_eq!(store.count(COLLECTION).await, Some(2));
}

#[tokio::test]
async fn blank_document_is_fatal() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = ingestion(store, Arc::new(HashEmbeddingProvider::new(DIM)));
    let err = pipeline.ingest(&Document::from_pages("empty.pdf", vec![" \n".into()])).await;
    assert!(matches!(err, Err(RagError::ChunkingError(_))));
}

#[tokio::test]
async fn wrong_embedding_length_is_fatal() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = ingestion(store.clone(), Arc::new(WrongDimensionProvider { dimensions: DIM }));
    let err = pipeline.ingest(&Document::from_text("doc.pdf", "some text")).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: DIM, actual } if actual == DIM + 1));
    assert_eq!(store.count(COLLECTION).await, None);
}

#[tokio::test]
async fn failed_embeddings_are_stored_as_zero_vectors() {
    let store = Arc::new(InMemoryVectorStore::new());
    let provider = Arc::new(FlakyEmbeddingProvider { dimensions: DIM, marker: "training".into() });
    let pipeline = ingestion(store.clone(), provider);
    let report =
        pipeline.ingest(&Document::from_pages("company.pdf", company_profile_pages())).await.unwrap();
    assert!(report.fallback_count > 0);
    assert!(report.fallback_count < report.chunk_count);
    assert_eq!(store.count(COLLECTION).await, Some(report.chunk_count));
}

#[tokio::test]
async fn unreachable_store_fails_ingestion() {
    let pipeline = ingestion(Arc::new(UnreachableStore), Arc::new(HashEmbeddingProvider::new(DIM)));
    let err = pipeline.ingest(&Document::from_text("doc.pdf", "text")).await.unwrap_err();
    assert!(matches!(err, RagError::VectorStoreError { .. }));
}

#[tokio::test]
async fn revenue_question_without_evidence_is_refused() {
    let store = Arc::new(InMemoryVectorStore::new());
    ingest_profile(&store).await;

    let chat = Arc::new(GroundedChatModel::new());
    let rag = search(store, chat.clone());
    assert_eq!(rag.initialize().await, PipelineState::Ready);

    let answer = rag.generate_answer("Qual o faturamento da empresa?").await;
    assert_eq!(answer, REFUSAL);

    let prompt = chat.last_prompt().unwrap();
    assert!(prompt.contains("USER QUESTION:\nQual o faturamento da empresa?"));
    let options = chat.prompts.lock().unwrap()[0].1;
    assert!((options.temperature - 0.1).abs() < f32::EPSILON);
    assert_eq!(options.max_output_tokens, 1000);
}

#[tokio::test]
async fn verbatim_chunk_query_ranks_that_chunk_first() {
    let store = Arc::new(InMemoryVectorStore::new());
    let contents = ingest_profile(&store).await;
    let target = &contents[2];

    let rag = search(store, Arc::new(GroundedChatModel::new()));
    rag.initialize().await;

    let results = rag.search_documents(target, 10).await;
    assert_eq!(results.len(), 10.min(contents.len()));
    assert_eq!(&results[0].content, target);
    assert!(results[0].score < 1e-4);
    for window in results.windows(2) {
        assert!(window[0].score <= window[1].score);
    }

    let answer = rag.generate_answer(target).await;
    assert_eq!(answer, "The context answers this.");
}

#[tokio::test]
async fn empty_collection_short_circuits_to_refusal() {
    let store = Arc::new(InMemoryVectorStore::new());
    let chat = Arc::new(GroundedChatModel::new());
    let rag = search(store, chat.clone());
    rag.initialize().await;

    assert_eq!(rag.generate_answer("anything at all").await, REFUSAL);
    assert!(chat.last_prompt().is_none());
    assert_eq!(rag.state().await, PipelineState::Ready);
}

#[tokio::test]
async fn unreachable_store_yields_internal_error() {
    let rag = search(Arc::new(UnreachableStore), Arc::new(GroundedChatModel::new()));
    assert!(matches!(rag.initialize().await, PipelineState::Failed(_)));

    assert_eq!(rag.generate_answer("Qual o faturamento da empresa?").await, INTERNAL_ERROR);
    assert!(rag.search_documents("query", 5).await.is_empty());

    let status = rag.system_status().await;
    assert!(!status.is_ready);
    assert_eq!(status.chunks, ChunkCount::Unready);

    // A failed pipeline stays failed.
    assert!(matches!(rag.initialize().await, PipelineState::Failed(_)));
}

#[tokio::test]
async fn lost_connection_after_startup_yields_internal_error() {
    let rag = search(Arc::new(DroppedConnectionStore), Arc::new(GroundedChatModel::new()));
    assert_eq!(rag.initialize().await, PipelineState::Ready);

    assert_eq!(rag.generate_answer("question").await, INTERNAL_ERROR);
    assert_eq!(rag.state().await, PipelineState::Ready);
    assert!(rag.search_documents("question", 3).await.is_empty());
    assert_eq!(rag.system_status().await.chunks, ChunkCount::Unready);
}

#[tokio::test]
async fn uninitialized_pipeline_answers_with_internal_error() {
    let store = Arc::new(InMemoryVectorStore::new());
    ingest_profile(&store).await;
    let rag = search(store, Arc::new(GroundedChatModel::new()));

    assert_eq!(rag.state().await, PipelineState::Uninitialized);
    assert_eq!(rag.generate_answer("training").await, INTERNAL_ERROR);
    assert!(rag.search_documents("training", 3).await.is_empty());
    assert!(matches!(rag.retrieve("training", 3).await, Err(RagError::NotReady(_))));
}

#[tokio::test]
async fn retrieve_reports_not_ready_until_initialized() {
    let store = Arc::new(InMemoryVectorStore::new());
    ingest_profile(&store).await;

    let failed = search(Arc::new(UnreachableStore), Arc::new(GroundedChatModel::new()));
    failed.initialize().await;
    match failed.retrieve("training", 3).await {
        Err(RagError::NotReady(state)) => assert!(state.starts_with("failed"), "{state}"),
        other => panic!("expected NotReady, got {other:?}"),
    }

    let rag = search(store, Arc::new(GroundedChatModel::new()));
    rag.initialize().await;
    let results = rag.retrieve("training", 3).await.unwrap();
    assert_eq!(results.len(), 3);

    rag.shutdown().await;
    assert!(matches!(rag.retrieve("training", 3).await, Err(RagError::NotReady(_))));
}

#[tokio::test]
async fn replace_failure_keeps_previous_chunks() {
    let store = Arc::new(InMemoryVectorStore::new());
    let contents = ingest_profile(&store).await;

    let err = store
        .replace_collection(COLLECTION, DIM, &[pdfqa_rag::Chunk {
            id: "bad".to_string(),
            content: "short vector".to_string(),
            metadata: Default::default(),
            embedding: vec![0.5; DIM - 1],
        }])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { .. }));
    assert_eq!(store.count(COLLECTION).await, Some(contents.len()));
}

#[tokio::test]
async fn generation_failure_returns_fallback_text() {
    let store = Arc::new(InMemoryVectorStore::new());
    ingest_profile(&store).await;
    let rag = search(store, Arc::new(BrokenChatModel));
    rag.initialize().await;

    assert_eq!(rag.generate_answer("training").await, pdfqa_rag::GENERATION_FALLBACK);
}

#[tokio::test]
async fn status_reflects_ingestion() {
    let store = Arc::new(InMemoryVectorStore::new());
    let rag = search(store.clone(), Arc::new(GroundedChatModel::new()));

    let status = rag.system_status().await;
    assert_eq!(status.chunks, ChunkCount::Unready);

    rag.initialize().await;
    let status = rag.system_status().await;
    assert!(!status.is_ready);
    assert_eq!(status.chunks, ChunkCount::Zero);

    ingest_profile(&store).await;
    let status = rag.system_status().await;
    assert!(status.is_ready);
    assert_eq!(status.chunks, ChunkCount::NonZeroUnknown);

    rag.shutdown().await;
    assert_eq!(rag.state().await, PipelineState::Uninitialized);
    assert!(!rag.system_status().await.is_ready);
}

#[tokio::test]
async fn context_budget_limits_prompt_size() {
    let store = Arc::new(InMemoryVectorStore::new());
    ingest_profile(&store).await;

    let chat = Arc::new(GroundedChatModel::new());
    let rag = RagSearch::builder()
        .config(RagConfig::builder().max_context_chars(Some(1200)).build().unwrap())
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .chat_model(chat.clone())
        .vector_store(store)
        .collection(COLLECTION)
        .build()
        .unwrap();
    rag.initialize().await;
    rag.generate_answer("training schedules").await;

    let prompt = chat.last_prompt().unwrap();
    let context = prompt
        .split("CONTEXT PROVIDED:\n")
        .nth(1)
        .and_then(|rest| rest.split("\n\nCRITICAL INSTRUCTIONS:").next())
        .unwrap();
    assert!(context.chars().count() <= 1200);
    assert!(!context.is_empty());
}

#[test]
fn builders_require_components() {
    assert!(matches!(RagSearch::builder().build(), Err(RagError::ConfigError(_))));
    assert!(matches!(IngestionPipeline::builder().build(), Err(RagError::ConfigError(_))));
}
