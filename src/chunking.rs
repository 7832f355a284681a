//! Document chunking for ingestion.
//!
//! Provides the [`Chunker`] trait and [`SentenceChunker`], a sentence-aware
//! sliding-window splitter. Chunkers produce [`Chunk`]s with text and
//! metadata but no embeddings; the pipeline attaches embeddings afterwards.

use crate::document::Chunk;

/// A strategy for splitting raw document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split a source document's text into chunks.
    ///
    /// Returns an empty `Vec` for empty or whitespace-only text. Each
    /// returned chunk has an empty embedding vector, ID
    /// `{source}_chunk_{index}`, and its `char_count` set.
    fn chunk(&self, source: &str, text: &str) -> Vec<Chunk>;
}

/// Sentence-aware sliding-window chunker.
///
/// Accumulates whole sentences until `chunk_size` characters would be
/// exceeded, then emits a chunk and carries the trailing `chunk_overlap`
/// characters into the next one. Sentences longer than `chunk_size` are
/// emitted as oversized chunks rather than being cut mid-sentence.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — target maximum characters per chunk
    /// * `chunk_overlap` — characters carried over between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

/// Collapse runs of whitespace into single spaces.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text on sentence-ending punctuation followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?')
            && bytes.get(i + 1).is_none_or(|b| b.is_ascii_whitespace())
        {
            let sentence = text[start..=i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = i + 1;
        }
        i += 1;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Take the last `n` characters of a string, respecting char boundaries.
fn char_tail(text: &str, n: usize) -> &str {
    let char_count = text.chars().count();
    if char_count <= n {
        return text;
    }
    let skip = char_count - n;
    let byte_start = text.char_indices().nth(skip).map_or(0, |(i, _)| i);
    &text[byte_start..]
}

impl Chunker for SentenceChunker {
    fn chunk(&self, source: &str, text: &str) -> Vec<Chunk> {
        let text = normalize_whitespace(text);
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();

        let mut push_chunk = |chunks: &mut Vec<Chunk>, text: &str| {
            let text = text.trim();
            if text.is_empty() {
                return;
            }
            let chunk_index = chunks.len();
            chunks.push(Chunk {
                id: format!("{source}_chunk_{chunk_index}"),
                text: text.to_string(),
                source: source.to_string(),
                chunk_index,
                embedding: Vec::new(),
                char_count: text.chars().count(),
            });
        };

        for sentence in split_sentences(&text) {
            let sentence_len = sentence.chars().count();
            if !current.is_empty() && current.chars().count() + sentence_len > self.chunk_size {
                let overlap = char_tail(&current, self.chunk_overlap).to_string();
                push_chunk(&mut chunks, &current);
                current = overlap;
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
        }

        push_chunk(&mut chunks, &current);
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = SentenceChunker::new(100, 20);
        assert!(chunker.chunk("a.txt", "").is_empty());
        assert!(chunker.chunk("a.txt", "   \n\t ").is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = SentenceChunker::new(100, 20);
        let chunks = chunker.chunk("a.txt", "One sentence. Another one.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "a.txt_chunk_0");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].char_count, chunks[0].text.chars().count());
    }

    #[test]
    fn long_text_splits_on_sentence_boundaries() {
        let chunker = SentenceChunker::new(60, 10);
        let text = "The first sentence talks about cats. The second sentence talks \
                    about dogs. The third sentence talks about birds.";
        let chunks = chunker.chunk("pets.txt", text);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.source, "pets.txt");
        }
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        let chunker = SentenceChunker::new(50, 15);
        let text = "Alpha beta gamma delta epsilon. Zeta eta theta iota kappa. \
                    Lambda mu nu xi omicron pi.";
        let chunks = chunker.chunk("greek.txt", text);
        assert!(chunks.len() >= 2);
        let tail: String = chunks[0].text.chars().rev().take(15).collect::<Vec<_>>()
            .into_iter().rev().collect();
        assert!(chunks[1].text.starts_with(tail.trim_start()));
    }

    #[test]
    fn whitespace_is_normalized() {
        let chunker = SentenceChunker::new(100, 20);
        let chunks = chunker.chunk("a.txt", "Spaced\n\nout\t text.");
        assert_eq!(chunks[0].text, "Spaced out text.");
    }
}
