//! Chat completion provider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ChatMessage;

/// Sampling options for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for chat-style text completion
///
/// Implementations:
/// - `OpenAiClient`: OpenAI-compatible `/v1/chat/completions`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Complete the conversation, returning the assistant's reply text
    async fn complete(&self, messages: &[ChatMessage], options: ChatOptions) -> Result<String>;

    /// Model used for completions
    fn model(&self) -> String;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
