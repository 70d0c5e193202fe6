//! Retrieval-augmented question answering over a user's documents

use std::sync::Arc;

use crate::config::{LlmConfig, RetrievalConfig};
use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::providers::{ChatOptions, ChatProvider, EmbeddingProvider, VectorIndexProvider, VectorMatch};
use crate::types::{ChatMessage, QueryResponse, Source};

/// Embeds a question, retrieves the user's closest chunks and asks the chat service
pub struct RetrievalQueryService {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorIndexProvider>,
    chat: Arc<dyn ChatProvider>,
    config: RetrievalConfig,
    chat_options: ChatOptions,
}

impl RetrievalQueryService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorIndexProvider>,
        chat: Arc<dyn ChatProvider>,
        config: RetrievalConfig,
        llm: &LlmConfig,
    ) -> Self {
        Self {
            embedder,
            vectors,
            chat,
            config,
            chat_options: ChatOptions {
                temperature: llm.temperature,
                max_tokens: llm.max_tokens,
            },
        }
    }

    /// Answer `query` from the documents in `user_id`'s namespace.
    ///
    /// When nothing scores above the threshold the canned answer is
    /// returned without calling the chat service.
    pub async fn answer(&self, query: &str, user_id: &str, history: &[ChatMessage]) -> Result<QueryResponse> {
        let embedding = self.embedder.embed(query).await?;

        let matches = self
            .vectors
            .query(user_id, &embedding, self.config.top_k)
            .await?;
        let retrieved = matches.len();
        let relevant = filter_matches(matches, self.config.similarity_threshold);

        tracing::info!(
            "Query for {}: {} matches, {} above threshold {}",
            user_id,
            retrieved,
            relevant.len(),
            self.config.similarity_threshold
        );

        if relevant.is_empty() {
            return Ok(QueryResponse::not_found(query));
        }

        let context = PromptBuilder::build_context(&relevant);
        let messages = PromptBuilder::build_chat_messages(&context, history, query);
        let answer = self.chat.complete(&messages, self.chat_options).await?;

        let sources = relevant
            .iter()
            .map(|m| source_for(m, self.config.preview_chars))
            .collect();

        Ok(QueryResponse {
            answer,
            sources,
            query: query.to_string(),
        })
    }
}

/// Matches scoring strictly above `threshold` that carry metadata, order preserved
pub fn filter_matches(matches: Vec<VectorMatch>, threshold: f32) -> Vec<VectorMatch> {
    matches
        .into_iter()
        .filter(|m| m.score > threshold)
        .filter(|m| {
            let has_metadata = m.metadata.is_some();
            if !has_metadata {
                tracing::debug!("Dropping match {} without metadata", m.id);
            }
            has_metadata
        })
        .collect()
}

fn source_for(m: &VectorMatch, preview_chars: usize) -> Source {
    let metadata = m.metadata.clone().unwrap_or_default();
    let preview: String = metadata.chunk_text.chars().take(preview_chars).collect();

    Source {
        document_title: if metadata.document_title.trim().is_empty() {
            "Untitled".to_string()
        } else {
            metadata.document_title
        },
        chunk_text: format!("{}...", preview),
        score: m.score,
        document_id: metadata.document_id,
    }
}
