//! Local provider implementations using the filesystem and process memory

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

use super::blob_store::BlobStore;
use super::vector_index::{VectorIndexProvider, VectorMatch, VectorRecord};

/// Local blob store rooted at a directory
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new local blob store, creating the directory if needed
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve a relative blob path, rejecting anything that escapes the root
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if path.is_empty() || escapes {
            return Err(Error::Storage(format!("Invalid blob path '{}'", path)));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, data).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read blob '{}': {}", path, e)))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "local-fs"
    }
}

/// In-process vector index with brute-force cosine search
#[derive(Default)]
pub struct InMemoryVectorIndex {
    namespaces: DashMap<String, HashMap<String, VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vectors stored in `namespace`
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map(|ns| ns.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Compute cosine similarity between two vectors
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndexProvider for InMemoryVectorIndex {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()> {
        let mut ns = self.namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            ns.insert(record.id.clone(), record.clone());
        }
        tracing::debug!("Upserted {} vectors into namespace {}", records.len(), namespace);
        Ok(())
    }

    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let Some(ns) = self.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<VectorMatch> = ns
            .values()
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: Self::cosine_similarity(vector, &record.values),
                metadata: Some(record.metadata.clone()),
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<()> {
        if let Some(mut ns) = self.namespaces.get_mut(namespace) {
            for id in ids {
                ns.remove(id);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
