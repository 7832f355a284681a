//! Configuration for the chat pipeline and evaluator.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the chat pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Number of candidates to retrieve from the vector store.
    pub top_k: usize,
    /// Number of candidates kept after reranking and fed to the LLM.
    pub rerank_top_k: usize,
    /// Conversation window size, in user+assistant pairs.
    pub max_turns: usize,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Character budget for the formatted history block in prompts.
    pub max_history_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            rerank_top_k: 3,
            max_turns: 10,
            chunk_size: 500,
            chunk_overlap: 100,
            max_history_chars: 2000,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for constructing a [`PipelineConfig`].
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the number of candidates retrieved from the vector store.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of candidates kept after reranking.
    pub fn rerank_top_k(mut self, k: usize) -> Self {
        self.config.rerank_top_k = k;
        self
    }

    /// Set the conversation window size in user+assistant pairs.
    pub fn max_turns(mut self, turns: usize) -> Self {
        self.config.max_turns = turns;
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the character budget for the formatted history block.
    pub fn max_history_chars(mut self, chars: usize) -> Self {
        self.config.max_history_chars = chars;
        self
    }

    /// Build the [`PipelineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `rerank_top_k == 0` or `top_k < rerank_top_k`
    /// - `max_turns == 0`
    /// - `chunk_overlap >= chunk_size`
    pub fn build(self) -> Result<PipelineConfig> {
        if self.config.rerank_top_k == 0 {
            return Err(RagError::Config("rerank_top_k must be greater than zero".to_string()));
        }
        if self.config.top_k < self.config.rerank_top_k {
            return Err(RagError::Config(format!(
                "top_k ({}) must be at least rerank_top_k ({})",
                self.config.top_k, self.config.rerank_top_k
            )));
        }
        if self.config.max_turns == 0 {
            return Err(RagError::Config("max_turns must be greater than zero".to_string()));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        Ok(self.config)
    }
}

/// Cut points mapping an aggregate evaluation score to a quality label.
///
/// A configuration surface, not a hidden constant: each bound is the minimum
/// aggregate for the corresponding label, checked from best to worst.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct QualityThresholds {
    /// Minimum aggregate for `Excellent`.
    pub excellent: f32,
    /// Minimum aggregate for `Good`.
    pub good: f32,
    /// Minimum aggregate for `Fair`. Anything below is `Poor`.
    pub fair: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self { excellent: 0.8, good: 0.6, fair: 0.4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn rejects_top_k_below_rerank_top_k() {
        let result = PipelineConfig::builder().top_k(2).rerank_top_k(5).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_zero_rerank_top_k() {
        let result = PipelineConfig::builder().rerank_top_k(0).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_overlap_at_least_chunk_size() {
        let result = PipelineConfig::builder().chunk_size(100).chunk_overlap(100).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_zero_max_turns() {
        let result = PipelineConfig::builder().max_turns(0).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }
}
