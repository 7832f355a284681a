//! Conversational RAG engine.
//!
//! `ragchat` answers natural-language questions by retrieving relevant
//! chunks from an ingested document collection, reranking them with a joint
//! relevance signal, and feeding the best chunks plus recent conversation
//! turns to a language model.
//!
//! This crate provides:
//! - The [`ChatPipeline`] orchestrator: retrieve → rerank → generate
//! - Capability traits at every provider seam ([`EmbeddingProvider`],
//!   [`VectorStore`], [`RelevanceModel`], [`LlmProvider`])
//! - [`InMemoryVectorStore`] with cosine similarity and source-level delete
//! - [`ConversationMemory`], a per-session sliding turn window
//! - [`Evaluator`], lexical answer-quality metrics with no model dependency
//!
//! Generation providers (`openai`, `ollama`) and the HTTP cross-encoder
//! relevance model (`http-rerank`) are feature-gated; without a provider the
//! pipeline runs in demo mode and answers with the retrieved context.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod inmemory;
pub mod llm;
pub mod memory;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod reranker;
pub mod vectorstore;

pub use chunking::{Chunker, SentenceChunker};
pub use config::{PipelineConfig, PipelineConfigBuilder, QualityThresholds};
pub use document::{ChatResponse, Chunk, RankedCandidate, RetrievedCandidate};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use eval::{EvaluationResult, Evaluator, QualityLabel};
pub use inmemory::InMemoryVectorStore;
pub use llm::LlmProvider;
pub use memory::{ConversationMemory, ConversationTurn, Role};
pub use pipeline::{ChatPipeline, ChatPipelineBuilder};
#[cfg(feature = "http-rerank")]
pub use reranker::HttpRelevanceModel;
pub use reranker::{LexicalRelevanceModel, RelevanceModel, Reranker};
pub use vectorstore::VectorStore;
