//! Data types for chunks, retrieval candidates, and chat responses.

use serde::{Deserialize, Serialize};

/// A bounded span of a source document, stored with its embedding.
///
/// Chunks are immutable once created and are owned by the vector store.
/// They are removed only by source-level deletion, which cascades to every
/// chunk of that source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{source}_chunk_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Identifier of the source document this chunk came from.
    pub source: String,
    /// Position of this chunk within its source document.
    pub chunk_index: usize,
    /// The vector embedding for this chunk's text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Character count of `text`.
    pub char_count: usize,
}

/// A chunk returned by similarity search, paired with its retrieval score.
///
/// Ephemeral: produced per query and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity between the query embedding and the chunk embedding.
    pub similarity_score: f32,
}

/// A retrieval candidate after cross-interaction re-scoring.
///
/// Ordering by `rerank_score` descending is the pipeline's externally
/// visible contract: this is what is shown to the user and fed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// First-stage similarity score from retrieval.
    pub similarity_score: f32,
    /// Second-stage joint relevance score from the reranker.
    pub rerank_score: f32,
}

/// The structured result of one chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated (or demo-mode fallback) answer.
    pub answer: String,
    /// Deduplicated source identifiers of the ranked candidates, in rank order.
    pub sources: Vec<String>,
    /// Texts of the ranked chunks fed to the LLM, best first.
    pub context_used: Vec<String>,
    /// The full ranked candidate list with both scores.
    pub reranked: Vec<RankedCandidate>,
    /// Wall-clock time spent answering, in seconds.
    pub elapsed_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_serializes_without_empty_embedding() {
        let chunk = Chunk {
            id: "guide.txt_chunk_0".into(),
            text: "hello".into(),
            source: "guide.txt".into(),
            chunk_index: 0,
            embedding: Vec::new(),
            char_count: 5,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(!json.contains("embedding"));

        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
