//! Error types for the `ragchat` crate.

use thiserror::Error;

/// Errors that can occur in the retrieval, generation, and evaluation flows.
#[derive(Debug, Error)]
pub enum RagError {
    /// A request field was empty or malformed. Rejected before any side effect.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while re-scoring retrieved candidates.
    #[error("Reranker error: {0}")]
    Reranker(String),

    /// The LLM provider is unreachable or misconfigured.
    ///
    /// The pipeline never surfaces this to callers of
    /// [`chat`](crate::pipeline::ChatPipeline::chat); it triggers the
    /// demo-mode fallback instead.
    #[error("LLM provider unavailable ({provider}): {message}")]
    ProviderUnavailable {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A required evaluation field was missing or empty.
    #[error("Evaluation input error: {0}")]
    EvaluationInput(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
