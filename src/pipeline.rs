//! The chat pipeline orchestrator.
//!
//! [`ChatPipeline`] composes the embedding provider, vector store, reranker,
//! conversation memory, and LLM provider into one request/response cycle:
//! embed the query, retrieve top-k candidates, rerank to top-n, assemble a
//! prompt with recent history, generate, and record the exchange.
//!
//! Generation degrades rather than fails: when no LLM provider is configured
//! or the provider errors, the answer falls back to the retrieved context
//! (demo mode). This is an explicit branch in the control flow, not an
//! afterthought exception handler, so a user always gets a response.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragchat::{ChatPipeline, InMemoryVectorStore, PipelineConfig};
//!
//! let pipeline = ChatPipeline::builder()
//!     .config(PipelineConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.ingest("guide.txt", &document_text).await?;
//! let response = pipeline.chat("What is covered?", "session-1").await?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::chunking::{Chunker, SentenceChunker};
use crate::config::PipelineConfig;
use crate::document::{Chunk, ChatResponse, RankedCandidate};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LlmProvider;
use crate::memory::{ConversationMemory, Role};
use crate::reranker::{LexicalRelevanceModel, RelevanceModel, Reranker};
use crate::vectorstore::VectorStore;

/// System instructions prepended to every generation prompt.
const SYSTEM_PROMPT: &str = "You are an intelligent assistant with access to a knowledge base.\n\
Answer questions using ONLY the provided context. If the context doesn't contain enough\n\
information to answer, say so clearly rather than making things up.\n\n\
Guidelines:\n\
- Be concise and accurate\n\
- Cite which document you used when relevant\n\
- If asked a follow-up, use the conversation history for context\n\
- Format code blocks properly if needed";

/// Answer returned when the knowledge base has nothing to retrieve.
const NO_KNOWLEDGE_ANSWER: &str = "I couldn't find relevant information in the knowledge \
base. Please upload documents first and then ask your question.";

/// The retrieve → rerank → generate orchestrator.
pub struct ChatPipeline {
    config: PipelineConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    reranker: Reranker,
    memory: Arc<ConversationMemory>,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl ChatPipeline {
    /// Create a new [`ChatPipelineBuilder`].
    pub fn builder() -> ChatPipelineBuilder {
        ChatPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return a reference to the conversation memory.
    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    /// Ingest a source document: chunk → embed → upsert.
    ///
    /// Re-ingesting the same source overwrites its chunks rather than
    /// duplicating them. Returns the stored chunks with embeddings attached.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] for an empty source identifier or
    /// empty text, and propagates embedding or store failures.
    pub async fn ingest(&self, source: &str, text: &str) -> Result<Vec<Chunk>> {
        if source.trim().is_empty() {
            return Err(RagError::InvalidInput("source identifier must not be empty".into()));
        }
        if text.trim().is_empty() {
            return Err(RagError::InvalidInput("document text must not be empty".into()));
        }

        let mut chunks = self.chunker.chunk(source, text);
        if chunks.is_empty() {
            info!(source, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await?;
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.upsert(&chunks).await?;
        info!(source, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Delete a source document and all of its chunks from the store.
    ///
    /// Returns the number of chunks removed.
    pub async fn delete_source(&self, source: &str) -> Result<usize> {
        self.vector_store.delete_source(source).await
    }

    /// Answer a query using the configured `top_k` / `rerank_top_k`.
    pub async fn chat(&self, query: &str, session_id: &str) -> Result<ChatResponse> {
        self.chat_with_options(query, session_id, self.config.top_k, self.config.rerank_top_k)
            .await
    }

    /// Answer a query with per-request retrieval parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] if the query is empty after
    /// trimming or `top_k < rerank_top_k` or `rerank_top_k == 0`. Embedding
    /// and store failures propagate with no memory mutation; LLM provider
    /// failures degrade to demo mode instead of erroring.
    pub async fn chat_with_options(
        &self,
        query: &str,
        session_id: &str,
        top_k: usize,
        rerank_top_k: usize,
    ) -> Result<ChatResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".into()));
        }
        if rerank_top_k == 0 {
            return Err(RagError::InvalidInput("rerank_top_k must be at least 1".into()));
        }
        if top_k < rerank_top_k {
            return Err(RagError::InvalidInput(format!(
                "top_k ({top_k}) must be at least rerank_top_k ({rerank_top_k})"
            )));
        }

        let started = Instant::now();

        // Stage 1: wide, fast net
        let query_embedding = self.embedding_provider.embed(query).await?;
        let candidates = self.vector_store.search(&query_embedding, top_k).await?;
        info!(session_id, retrieved = candidates.len(), "retrieved candidates");

        if candidates.is_empty() {
            let answer = NO_KNOWLEDGE_ANSWER.to_string();
            self.record_turn(session_id, query, &answer).await;
            return Ok(ChatResponse {
                answer,
                sources: Vec::new(),
                context_used: Vec::new(),
                reranked: Vec::new(),
                elapsed_sec: started.elapsed().as_secs_f64(),
            });
        }

        // Stage 2: slow, precise re-sort
        let ranked = self.reranker.rerank(query, candidates, rerank_top_k).await?;

        let context_text = concat_context(&ranked);
        let history = self.memory.format_history(session_id, self.config.max_history_chars).await;
        let prompt = build_prompt(query, &history, &ranked);

        let answer = match &self.llm {
            Some(provider) => match provider.generate(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    error!(
                        provider = provider.name(),
                        error = %e,
                        "generation failed, degrading to retrieved context"
                    );
                    context_text.clone()
                }
            },
            // Demo mode: no generation provider configured
            None => context_text.clone(),
        };

        self.record_turn(session_id, query, &answer).await;

        let sources = dedup_sources(&ranked);
        let context_used = ranked.iter().map(|r| r.chunk.text.clone()).collect();
        let elapsed_sec = started.elapsed().as_secs_f64();
        info!(session_id, kept = ranked.len(), elapsed_sec, "chat request completed");

        Ok(ChatResponse { answer, sources, context_used, reranked: ranked, elapsed_sec })
    }

    async fn record_turn(&self, session_id: &str, query: &str, answer: &str) {
        self.memory.append(session_id, Role::User, query).await;
        self.memory.append(session_id, Role::Assistant, answer).await;
    }
}

/// Join ranked chunk texts into the demo-mode answer.
fn concat_context(ranked: &[RankedCandidate]) -> String {
    ranked.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Deduplicate source identifiers, preserving rank order.
fn dedup_sources(ranked: &[RankedCandidate]) -> Vec<String> {
    let mut seen = HashSet::new();
    ranked
        .iter()
        .filter(|r| seen.insert(r.chunk.source.as_str()))
        .map(|r| r.chunk.source.clone())
        .collect()
}

/// Assemble the generation prompt from system instructions, numbered context
/// blocks, the formatted history, and the current query.
fn build_prompt(query: &str, history: &str, ranked: &[RankedCandidate]) -> String {
    let context_blocks: Vec<String> = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] Source: {}\n{}", i + 1, r.chunk.source, r.chunk.text))
        .collect();
    let context = context_blocks.join("\n\n---\n\n");

    let history_section = if history.is_empty() {
        String::new()
    } else {
        format!("Conversation so far:\n{history}\n\n")
    };

    format!(
        "{SYSTEM_PROMPT}\n\nContext from knowledge base:\n{context}\n\n\
         {history_section}Question: {query}\n\nAnswer based strictly on the context above:"
    )
}

/// Builder for constructing a [`ChatPipeline`].
///
/// `embedding_provider` and `vector_store` are required. The chunker defaults
/// to a [`SentenceChunker`] sized from the config, the relevance model to
/// [`LexicalRelevanceModel`], and the memory to a fresh store sized from
/// `max_turns`. Leaving the LLM provider unset selects demo mode.
#[derive(Default)]
pub struct ChatPipelineBuilder {
    config: Option<PipelineConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    relevance_model: Option<Arc<dyn RelevanceModel>>,
    memory: Option<Arc<ConversationMemory>>,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl ChatPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the cross-interaction relevance model used for reranking.
    pub fn relevance_model(mut self, model: Arc<dyn RelevanceModel>) -> Self {
        self.relevance_model = Some(model);
        self
    }

    /// Share an existing conversation memory with the pipeline.
    pub fn memory(mut self, memory: Arc<ConversationMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Set the generation provider. Leaving this unset selects demo mode.
    pub fn llm_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(provider);
        self
    }

    /// Build the [`ChatPipeline`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the embedding provider or vector
    /// store is missing.
    pub fn build(self) -> Result<ChatPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(SentenceChunker::new(config.chunk_size, config.chunk_overlap))
        });
        let relevance_model =
            self.relevance_model.unwrap_or_else(|| Arc::new(LexicalRelevanceModel));
        let memory =
            self.memory.unwrap_or_else(|| Arc::new(ConversationMemory::new(config.max_turns)));

        Ok(ChatPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            reranker: Reranker::new(relevance_model),
            memory,
            llm: self.llm,
        })
    }
}
