//! End-to-end pipeline tests with stub providers.

use std::sync::Arc;

use async_trait::async_trait;
use ragchat::{
    ChatPipeline, EmbeddingProvider, InMemoryVectorStore, LlmProvider, PipelineConfig,
    RagError, Result, RetrievedCandidate, Role, VectorStore,
};

/// Deterministic embedder: letter-frequency vector over a-z, L2-normalized.
/// Texts sharing vocabulary land close together under cosine similarity.
struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut counts = vec![0.0f32; 26];
        for c in text.to_lowercase().chars() {
            if c.is_ascii_lowercase() {
                counts[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        let norm: f32 = counts.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut counts {
                *val /= norm;
            }
        }
        Ok(counts)
    }

    fn dimensions(&self) -> usize {
        26
    }
}

/// An LLM stub that always answers the same thing.
struct CannedLlm(&'static str);

#[async_trait]
impl LlmProvider for CannedLlm {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// An LLM stub that is always unreachable.
struct BrokenLlm;

#[async_trait]
impl LlmProvider for BrokenLlm {
    fn name(&self) -> &str {
        "broken"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::ProviderUnavailable {
            provider: "broken".into(),
            message: "connection refused".into(),
        })
    }
}

/// A vector store whose search always fails.
struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn upsert(&self, _chunks: &[ragchat::Chunk]) -> Result<()> {
        Ok(())
    }

    async fn search(&self, _embedding: &[f32], _top_k: usize) -> Result<Vec<RetrievedCandidate>> {
        Err(RagError::VectorStore { backend: "broken".into(), message: "down".into() })
    }

    async fn delete_source(&self, _source: &str) -> Result<usize> {
        Ok(0)
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

fn demo_pipeline() -> ChatPipeline {
    ChatPipeline::builder()
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap()
}

async fn seed(pipeline: &ChatPipeline) {
    pipeline
        .ingest(
            "rag.txt",
            "Retrieval augmented generation combines a document index with a \
             language model. The retriever finds candidate passages. The \
             generator writes an answer grounded in those passages.",
        )
        .await
        .unwrap();
    pipeline
        .ingest(
            "bread.txt",
            "Banana bread needs ripe bananas and flour. Bake the loaf for an \
             hour at moderate heat. Cool it before slicing.",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_corpus_returns_fallback_without_error() {
    let pipeline = demo_pipeline();
    let response =
        pipeline.chat_with_options("anything", "s1", 5, 3).await.unwrap();

    assert!(response.sources.is_empty());
    assert!(response.reranked.is_empty());
    assert!(response.context_used.is_empty());
    assert!(!response.answer.is_empty());
}

#[tokio::test]
async fn demo_mode_answers_with_retrieved_context() {
    let pipeline = demo_pipeline();
    seed(&pipeline).await;

    let response = pipeline.chat("How does retrieval work?", "s1").await.unwrap();

    assert!(!response.sources.is_empty());
    assert!(!response.reranked.is_empty());
    assert_eq!(response.answer, response.context_used.join("\n\n"));
}

#[tokio::test]
async fn reranked_length_and_score_ordering() {
    let pipeline = demo_pipeline();
    seed(&pipeline).await;

    let response = pipeline
        .chat_with_options("retrieval augmented generation", "s1", 4, 2)
        .await
        .unwrap();

    assert_eq!(response.reranked.len(), 2);
    for window in response.reranked.windows(2) {
        assert!(window[0].rerank_score >= window[1].rerank_score);
    }
    assert_eq!(response.context_used.len(), response.reranked.len());
}

#[tokio::test]
async fn configured_provider_supplies_the_answer() {
    let pipeline = ChatPipeline::builder()
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .llm_provider(Arc::new(CannedLlm("The answer is retrieval.")))
        .build()
        .unwrap();
    seed(&pipeline).await;

    let response = pipeline.chat("How does retrieval work?", "s1").await.unwrap();
    assert_eq!(response.answer, "The answer is retrieval.");
}

#[tokio::test]
async fn provider_failure_degrades_to_context() {
    let pipeline = ChatPipeline::builder()
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .llm_provider(Arc::new(BrokenLlm))
        .build()
        .unwrap();
    seed(&pipeline).await;

    let response = pipeline.chat("How does retrieval work?", "s1").await.unwrap();
    assert_eq!(response.answer, response.context_used.join("\n\n"));
}

#[tokio::test]
async fn chat_records_both_turns() {
    let pipeline = demo_pipeline();
    seed(&pipeline).await;

    let response = pipeline.chat("How does retrieval work?", "s1").await.unwrap();

    let turns = pipeline.memory().recent("s1").await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "How does retrieval work?");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, response.answer);
}

#[tokio::test]
async fn sessions_do_not_leak_between_chats() {
    let pipeline = demo_pipeline();
    seed(&pipeline).await;

    pipeline.chat("question from alice", "alice").await.unwrap();
    pipeline.chat("question from bob", "bob").await.unwrap();

    let alice = pipeline.memory().recent("alice").await;
    assert!(alice.iter().all(|t| !t.content.contains("bob")));
    let bob = pipeline.memory().recent("bob").await;
    assert!(bob.iter().all(|t| !t.content.contains("alice")));
}

#[tokio::test]
async fn invalid_inputs_are_rejected_before_side_effects() {
    let pipeline = demo_pipeline();
    seed(&pipeline).await;

    let err = pipeline.chat("   ", "s1").await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));

    let err = pipeline.chat_with_options("q", "s1", 2, 5).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));

    let err = pipeline.chat_with_options("q", "s1", 5, 0).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));

    assert!(pipeline.memory().recent("s1").await.is_empty());
}

#[tokio::test]
async fn retrieval_failure_leaves_no_partial_turn() {
    let pipeline = ChatPipeline::builder()
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(Arc::new(BrokenStore))
        .build()
        .unwrap();

    let err = pipeline.chat("a question", "s1").await.unwrap_err();
    assert!(matches!(err, RagError::VectorStore { .. }));
    assert!(pipeline.memory().recent("s1").await.is_empty());
}

#[tokio::test]
async fn reingesting_a_source_does_not_duplicate_chunks() {
    let pipeline = demo_pipeline();
    let first = pipeline.ingest("doc.txt", "A short document.").await.unwrap();
    let second = pipeline.ingest("doc.txt", "A short document.").await.unwrap();

    assert_eq!(first.len(), second.len());
    assert_eq!(pipeline.vector_store().count().await.unwrap(), first.len());
}

#[tokio::test]
async fn delete_source_empties_the_corpus() {
    let pipeline = demo_pipeline();
    seed(&pipeline).await;

    let before = pipeline.vector_store().count().await.unwrap();
    let deleted = pipeline.delete_source("bread.txt").await.unwrap();
    assert_eq!(pipeline.vector_store().count().await.unwrap(), before - deleted);

    let response = pipeline.chat("banana bread recipe", "s1").await.unwrap();
    assert!(response.sources.iter().all(|s| s != "bread.txt"));
}

#[tokio::test]
async fn window_bounds_total_turns() {
    let config = PipelineConfig::builder().max_turns(2).build().unwrap();
    let pipeline = ChatPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();
    seed(&pipeline).await;

    for i in 0..5 {
        pipeline.chat(&format!("question number {i}"), "s1").await.unwrap();
    }

    let turns = pipeline.memory().recent("s1").await;
    assert_eq!(turns.len(), 4); // 2 pairs
    assert_eq!(turns[2].content, "question number 4");
}
