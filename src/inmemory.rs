//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] is a zero-dependency store backed by a `HashMap`
//! protected by a `tokio::sync::RwLock`. It is suitable for development,
//! testing, and single-process deployments.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::document::{Chunk, RetrievedCandidate};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// An in-memory chunk index using cosine similarity for search.
///
/// Chunks are keyed by ID. Source-level deletion happens under a single
/// write lock, so callers never observe a partially deleted source.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedCandidate>> {
        let store = self.chunks.read().await;

        let mut scored: Vec<RetrievedCandidate> = store
            .values()
            .map(|chunk| {
                let similarity_score = cosine_similarity(&chunk.embedding, embedding);
                RetrievedCandidate { chunk: chunk.clone(), similarity_score }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity_score.partial_cmp(&a.similarity_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_source(&self, source: &str) -> Result<usize> {
        let mut store = self.chunks.write().await;
        let ids: Vec<String> = store
            .values()
            .filter(|chunk| chunk.source == source)
            .map(|chunk| chunk.id.clone())
            .collect();

        if ids.is_empty() {
            return Err(RagError::VectorStore {
                backend: "InMemory".to_string(),
                message: format!("source '{source}' not found"),
            });
        }

        for id in &ids {
            store.remove(id);
        }
        info!(source, deleted = ids.len(), "deleted source chunks");
        Ok(ids.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.chunks.read().await.len())
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        let store = self.chunks.read().await;
        let sources: BTreeSet<String> =
            store.values().map(|chunk| chunk.source.clone()).collect();
        Ok(sources.into_iter().collect())
    }
}
