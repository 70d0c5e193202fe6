//! OpenAI-compatible embedding and chat completion client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::types::ChatMessage;

use super::chat::{ChatOptions, ChatProvider};
use super::embedding::EmbeddingProvider;

const SERVICE: &str = "openai";

/// HTTP client for `/v1/embeddings` and `/v1/chat/completions`
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: Option<String>,
    embed_model: String,
    dimensions: usize,
    chat_model: String,
}

impl OpenAiClient {
    /// Create a client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.api_key.is_none() {
            tracing::warn!("No OpenAI API key configured; requests will be unauthenticated");
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header: config.api_key.as_ref().map(|key| format!("Bearer {}", key)),
            embed_model: config.embed_model.clone(),
            dimensions: config.dimensions,
            chat_model: config.chat_model.clone(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::external(SERVICE, format!("Request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::external(
                SERVICE,
                format!("{} returned {}: {}", path, status, body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, format!("Failed to parse {} response: {}", path, e)))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embed_model,
            input: text,
        };

        let response: EmbeddingResponse = self.post("/v1/embeddings", &request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::external(SERVICE, "No embedding in response"))?;

        if embedding.len() != self.dimensions {
            return Err(Error::external(
                SERVICE,
                format!(
                    "Expected {} embedding dimensions, got {}",
                    self.dimensions,
                    embedding.len()
                ),
            ));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], options: ChatOptions) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response: ChatResponse = self.post("/v1/chat/completions", &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::external(SERVICE, "No completion in response"))
    }

    fn model(&self) -> String {
        self.chat_model.clone()
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, dimensions: usize) -> LlmConfig {
        LlmConfig {
            base_url: server.uri(),
            api_key: Some("sk-test".into()),
            dimensions,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_embed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "text-embedding-3-small",
                "input": "Termination clause",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3], "object": "embedding" }],
                "model": "text-embedding-3-small",
                "usage": { "prompt_tokens": 2, "total_tokens": 2 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server, 3)).unwrap();
        let embedding = client.embed("Termination clause").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_dimension_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [0.1, 0.2] }]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server, 1536)).unwrap();
        let err = client.embed("text").await.unwrap_err();
        assert!(matches!(err, Error::ExternalService { .. }));
    }

    #[tokio::test]
    async fn test_embed_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server, 3)).unwrap();
        let err = client.embed("text").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "Be brief." },
                    { "role": "user", "content": "Who pays rent?" }
                ],
                "max_tokens": 1000,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "The tenant." } }]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server, 3)).unwrap();
        let reply = client
            .complete(
                &[ChatMessage::system("Be brief."), ChatMessage::user("Who pays rent?")],
                ChatOptions {
                    temperature: 0.1,
                    max_tokens: 1000,
                },
            )
            .await
            .unwrap();
        assert_eq!(reply, "The tenant.");
    }

    #[tokio::test]
    async fn test_complete_without_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server, 3)).unwrap();
        let result = client
            .complete(
                &[ChatMessage::user("hi")],
                ChatOptions {
                    temperature: 0.0,
                    max_tokens: 10,
                },
            )
            .await;
        assert!(result.is_err());
    }
}
