//! Vector store trait: the persistent chunk index the pipeline searches.

use async_trait::async_trait;

use crate::document::{Chunk, RetrievedCandidate};
use crate::error::Result;

/// A storage backend for document chunks with similarity search.
///
/// The pipeline treats implementations as an opaque nearest-neighbor index:
/// it upserts chunks at ingestion, searches by query embedding at chat time,
/// and deletes at the source-document level. Source deletion must cascade to
/// every chunk of that source with no partial deletion visible to callers.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert chunks. Chunks must have embeddings set; re-ingesting a source
    /// overwrites chunks with the same ID rather than duplicating them.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` chunks nearest to the given embedding.
    ///
    /// Returns candidates ordered by descending similarity score.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedCandidate>>;

    /// Delete every chunk belonging to a source document.
    ///
    /// Returns the number of chunks removed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`](crate::RagError::VectorStore) if the
    /// source is unknown.
    async fn delete_source(&self, source: &str) -> Result<usize>;

    /// Total number of chunks stored.
    async fn count(&self) -> Result<usize>;

    /// Sorted, deduplicated identifiers of all ingested sources.
    async fn list_sources(&self) -> Result<Vec<String>>;
}
