//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OpenAiClient`: OpenAI-compatible `/v1/embeddings`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for one text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimensions (1536 for text-embedding-3-small)
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
