//! Property tests for in-memory vector store search ordering.

use std::collections::HashMap;

use pdfqa_rag::document::{Chunk, ChunkMetadata};
use pdfqa_rag::inmemory::InMemoryVectorStore;
use pdfqa_rag::vectorstore::VectorStore;
use pdfqa_rag::RagError;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, content, embedding)| Chunk {
            id,
            content,
            embedding,
            metadata: ChunkMetadata { source: "doc.pdf".to_string(), ..Default::default() },
        },
    )
}

fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: id.to_string(),
        content: format!("content of {id}"),
        metadata: ChunkMetadata::default(),
        embedding,
    }
}

/// Searching SHALL return results ordered by ascending cosine distance, and
/// the number of results SHALL be at most k.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_ascending_and_bounded_by_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();

                // Deduplicate chunks by id to avoid upsert overwriting
                let mut deduped: HashMap<String, Chunk> = HashMap::new();
                for chunk in &chunks {
                    deduped.entry(chunk.id.clone()).or_insert_with(|| chunk.clone());
                }
                let unique_chunks: Vec<Chunk> = deduped.into_values().collect();
                let count = unique_chunks.len();

                store.upsert("test", &unique_chunks).await.unwrap();
                let results = store.nearest_neighbors("test", &query, k).await.unwrap();
                (results, count)
            });

            let (results, unique_count) = results;

            prop_assert_eq!(results.len(), k.min(unique_count));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score <= window[1].score,
                    "results not in ascending order: {} > {}",
                    window[0].score,
                    window[1].score,
                );
            }
            for result in &results {
                prop_assert!((0.0..=2.0 + 1e-5).contains(&result.score));
            }
        }
    }
}

#[tokio::test]
async fn upsert_rejects_wrong_dimensions() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 3).await.unwrap();

    let err = store.upsert("docs", &[chunk("a", vec![1.0, 0.0])]).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
    assert_eq!(store.count("docs").await, Some(0));
}

#[tokio::test]
async fn recreating_with_other_dimensions_fails() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 3).await.unwrap();
    store.create_collection("docs", 3).await.unwrap();
    assert!(store.create_collection("docs", 4).await.is_err());

    store.delete_collection("docs").await.unwrap();
    store.create_collection("docs", 4).await.unwrap();
}

#[tokio::test]
async fn missing_collection_is_an_error() {
    let store = InMemoryVectorStore::new();
    assert!(store.nearest_neighbors("nope", &[1.0], 1).await.is_err());
    assert!(store.upsert("nope", &[chunk("a", vec![1.0])]).await.is_err());
}

#[tokio::test]
async fn zero_vectors_sort_after_real_matches() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 2).await.unwrap();
    store
        .upsert(
            "docs",
            &[chunk("zero", vec![0.0, 0.0]), chunk("near", vec![1.0, 0.1]), chunk("far", vec![-1.0, 0.0])],
        )
        .await
        .unwrap();

    let results = store.nearest_neighbors("docs", &[1.0, 0.0], 3).await.unwrap();
    let order: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(order, vec!["content of near", "content of zero", "content of far"]);
    assert!((results[1].score - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn replace_swaps_contents() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 2).await.unwrap();
    store.upsert("docs", &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])]).await.unwrap();

    store.replace_collection("docs", 3, &[chunk("c", vec![0.0, 0.0, 1.0])]).await.unwrap();
    assert_eq!(store.count("docs").await, Some(1));
    let results = store.nearest_neighbors("docs", &[0.0, 0.0, 1.0], 5).await.unwrap();
    assert_eq!(results[0].content, "content of c");
}

#[tokio::test]
async fn failed_replace_keeps_previous_contents() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 2).await.unwrap();
    store.upsert("docs", &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])]).await.unwrap();

    let err = store
        .replace_collection("docs", 2, &[chunk("c", vec![1.0, 0.0]), chunk("d", vec![1.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 1 }));
    assert_eq!(store.count("docs").await, Some(2));
    assert!(store.nearest_neighbors("docs", &[1.0, 0.0], 1).await.is_ok());
}
