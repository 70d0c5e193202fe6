//! Pinecone REST vector index

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};

use super::vector_index::{VectorIndexProvider, VectorMatch, VectorRecord};

const SERVICE: &str = "pinecone";

/// Pinecone index addressed by its host URL
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    http: reqwest::Client,
    index_url: String,
    api_key: String,
    upsert_batch_size: usize,
}

impl PineconeIndex {
    /// Create from configuration; requires `index_url` and `api_key`
    pub fn new(config: &VectorIndexConfig) -> Result<Self> {
        let index_url = config
            .index_url
            .as_deref()
            .ok_or_else(|| Error::Config("Pinecone index_url is not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("Pinecone api_key is not set".into()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            index_url: index_url.trim_end_matches('/').to_string(),
            api_key,
            upsert_batch_size: config.upsert_batch_size.max(1),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.index_url, path);
        let response = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
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
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    namespace: &'a str,
}

#[async_trait]
impl VectorIndexProvider for PineconeIndex {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()> {
        for batch in records.chunks(self.upsert_batch_size) {
            let response: UpsertResponse = self
                .post("/vectors/upsert", &UpsertRequest {
                    vectors: batch,
                    namespace,
                })
                .await?;

            tracing::debug!(
                "Pinecone upserted {} vectors into namespace {}",
                response.upserted_count,
                namespace
            );
        }
        Ok(())
    }

    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let response: QueryResponse = self
            .post("/query", &QueryRequest {
                vector,
                top_k,
                namespace,
                include_metadata: true,
            })
            .await?;

        Ok(response.matches)
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        for batch in ids.chunks(self.upsert_batch_size) {
            let _: serde_json::Value = self
                .post("/vectors/delete", &DeleteRequest {
                    ids: batch,
                    namespace,
                })
                .await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}
