//! Sentence-based chunking with overlap

use crate::config::ChunkingConfig;

use super::tokens::estimate_tokens;

/// Greedy sentence packer.
///
/// Sentences are accumulated until the next one would push the estimated
/// token count past `max_tokens`; the closed chunk's last
/// `overlap_sentences` sentences then seed the next chunk. Sentences are
/// never split, so a single oversized sentence becomes its own chunk.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Estimated token budget per chunk
    max_tokens: usize,
    /// Sentences repeated at the start of the following chunk
    overlap_sentences: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(max_tokens: usize, overlap_sentences: usize) -> Self {
        Self {
            max_tokens,
            overlap_sentences,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.max_tokens, config.overlap_sentences)
    }

    /// Split `text` into ordered chunk strings.
    ///
    /// Empty input (or input without any sentence content) yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut token_count = 0usize;

        for fragment in split_sentences(text) {
            let sentence = format!("{}.", fragment);
            let sentence_tokens = estimate_tokens(&sentence);

            if !current.is_empty() && token_count + sentence_tokens > self.max_tokens {
                chunks.push(current.join(" "));

                let keep_from = current.len().saturating_sub(self.overlap_sentences);
                current = current.split_off(keep_from);
                current.push(sentence);
                token_count = estimate_tokens(&current.join(" "));
            } else {
                token_count += sentence_tokens;
                current.push(sentence);
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Split on `.`, `!` and `?`, dropping empty fragments
fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
