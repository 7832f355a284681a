//! Second-stage reranking of retrieved candidates.
//!
//! Retrieval casts a wide, fast net with bi-encoder similarity; the
//! [`Reranker`] re-sorts those candidates with a slower, higher-fidelity
//! joint signal from a [`RelevanceModel`] scoring each (query, chunk) pair.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::document::{RankedCandidate, RetrievedCandidate};
use crate::error::Result;

/// A model that scores a (query, document) pair jointly.
///
/// This is the cross-encoder seam: implementations may call a model serving
/// endpoint or compute a local heuristic. Higher scores mean more relevant.
#[async_trait]
pub trait RelevanceModel: Send + Sync {
    /// Score the relevance of `text` to `query`.
    async fn score(&self, query: &str, text: &str) -> Result<f32>;

    /// Score a batch of texts against one query.
    ///
    /// The default implementation calls [`score`](RelevanceModel::score)
    /// sequentially. Backends with native batch scoring should override it.
    async fn score_batch(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(texts.len());
        for text in texts {
            scores.push(self.score(query, text).await?);
        }
        Ok(scores)
    }
}

/// Reranks retrieval candidates by joint relevance score.
pub struct Reranker {
    model: Arc<dyn RelevanceModel>,
}

impl Reranker {
    /// Create a reranker backed by the given relevance model.
    pub fn new(model: Arc<dyn RelevanceModel>) -> Self {
        Self { model }
    }

    /// Re-score candidates and keep the best `keep_n`.
    ///
    /// Output length is `min(keep_n, candidates.len())`, sorted by
    /// `rerank_score` descending. The sort is stable: candidates with equal
    /// scores retain their original retrieval order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Reranker`](crate::RagError::Reranker) if the
    /// relevance model fails.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedCandidate>,
        keep_n: usize,
    ) -> Result<Vec<RankedCandidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        let scores = self.model.score_batch(query, &texts).await?;

        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, rerank_score)| RankedCandidate {
                chunk: candidate.chunk,
                similarity_score: candidate.similarity_score,
                rerank_score,
            })
            .collect();

        // sort_by is stable, so ties keep retrieval order
        ranked.sort_by(|a, b| {
            b.rerank_score.partial_cmp(&a.rerank_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(keep_n);

        info!(
            kept = ranked.len(),
            best_score = ranked.first().map(|r| r.rerank_score),
            "reranked candidates"
        );
        Ok(ranked)
    }
}

/// A dependency-free relevance model using normalized token overlap.
///
/// Scores a pair as the fraction of query content tokens (length > 3,
/// lowercase) that appear in the document text. Deterministic, suitable as
/// the default when no cross-encoder endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalRelevanceModel;

#[async_trait]
impl RelevanceModel for LexicalRelevanceModel {
    async fn score(&self, query: &str, text: &str) -> Result<f32> {
        let text_lower = text.to_lowercase();
        let query_lower = query.to_lowercase();
        let keywords: Vec<&str> =
            query_lower.split_whitespace().filter(|w| w.len() > 3).collect();

        if keywords.is_empty() {
            return Ok(0.0);
        }

        let hits = keywords.iter().filter(|kw| text_lower.contains(*kw)).count();
        Ok(hits as f32 / keywords.len() as f32)
    }
}

/// A relevance model backed by a cross-encoder serving endpoint.
///
/// Posts `{ "query": ..., "texts": [...] }` to a text-embeddings-inference
/// style `/rerank` endpoint and reads back per-text scores.
#[cfg(feature = "http-rerank")]
pub struct HttpRelevanceModel {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "http-rerank")]
impl HttpRelevanceModel {
    /// Create a model pointing at the given `/rerank` endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }
}

#[cfg(feature = "http-rerank")]
#[async_trait]
impl RelevanceModel for HttpRelevanceModel {
    async fn score(&self, query: &str, text: &str) -> Result<f32> {
        let scores = self.score_batch(query, &[text]).await?;
        scores.into_iter().next().ok_or_else(|| {
            crate::error::RagError::Reranker("rerank endpoint returned no scores".into())
        })
    }

    async fn score_batch(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        use crate::error::RagError;
        use serde::Deserialize;

        #[derive(Deserialize)]
        struct RankEntry {
            index: usize,
            score: f32,
        }

        let body = serde_json::json!({ "query": query, "texts": texts });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Reranker(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RagError::Reranker(format!(
                "rerank endpoint returned {}",
                response.status()
            )));
        }

        let entries: Vec<RankEntry> = response
            .json()
            .await
            .map_err(|e| RagError::Reranker(format!("failed to parse response: {e}")))?;

        // The endpoint returns entries sorted by score; restore input order.
        let mut scores = vec![0.0; texts.len()];
        for entry in entries {
            if entry.index >= scores.len() {
                return Err(RagError::Reranker(format!(
                    "rerank endpoint returned out-of-range index {}",
                    entry.index
                )));
            }
            scores[entry.index] = entry.score;
        }
        Ok(scores)
    }
}
