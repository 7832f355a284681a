//! Property tests for in-memory vector store search ordering and
//! source-level deletion.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use ragchat::document::Chunk;
use ragchat::inmemory::InMemoryVectorStore;
use ragchat::vectorstore::VectorStore;

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

/// Generate a chunk with a normalized embedding, drawn from a small pool of
/// source documents.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-c]\\.txt", 0usize..50, "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(source, chunk_index, text, embedding)| Chunk {
            id: format!("{source}_chunk_{chunk_index}"),
            char_count: text.chars().count(),
            text,
            source,
            chunk_index,
            embedding,
        },
    )
}

/// Deduplicate generated chunks by ID so upserts don't overwrite each other.
fn dedup_by_id(chunks: &[Chunk]) -> Vec<Chunk> {
    let mut deduped: HashMap<String, Chunk> = HashMap::new();
    for chunk in chunks {
        deduped.entry(chunk.id.clone()).or_insert_with(|| chunk.clone());
    }
    deduped.into_values().collect()
}

const DIM: usize = 16;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Searching returns results ordered by descending cosine similarity,
    /// never more than top_k of them.
    #[test]
    fn search_ordered_descending_and_bounded_by_top_k(
        chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
        query in arb_normalized_embedding(DIM),
        top_k in 1usize..25,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (results, stored) = rt.block_on(async {
            let store = InMemoryVectorStore::new();
            let unique = dedup_by_id(&chunks);
            let stored = unique.len();
            store.upsert(&unique).await.unwrap();
            (store.search(&query, top_k).await.unwrap(), stored)
        });

        prop_assert!(results.len() <= top_k);
        prop_assert!(results.len() <= stored);

        for window in results.windows(2) {
            prop_assert!(
                window[0].similarity_score >= window[1].similarity_score,
                "results not in descending order: {} < {}",
                window[0].similarity_score,
                window[1].similarity_score,
            );
        }
    }

    /// Deleting a source removes exactly its chunks: the count drops by the
    /// source's chunk count and no search result references it afterwards.
    #[test]
    fn delete_source_removes_exactly_its_chunks(
        chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
        query in arb_normalized_embedding(DIM),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = InMemoryVectorStore::new();
            let unique = dedup_by_id(&chunks);
            store.upsert(&unique).await.unwrap();

            let victim = unique[0].source.clone();
            let victim_count = unique.iter().filter(|c| c.source == victim).count();
            let before = store.count().await.unwrap();

            let deleted = store.delete_source(&victim).await.unwrap();
            assert_eq!(deleted, victim_count);
            assert_eq!(store.count().await.unwrap(), before - victim_count);

            let sources: HashSet<String> =
                store.list_sources().await.unwrap().into_iter().collect();
            assert!(!sources.contains(&victim));

            let results = store.search(&query, before).await.unwrap();
            assert!(results.iter().all(|r| r.chunk.source != victim));
        });
    }
}
