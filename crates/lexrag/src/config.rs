//! Configuration for the document pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ingestion::PdfMode;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Text extraction configuration
    pub extraction: ExtractionConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding / chat completion service configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Vector index configuration
    pub vector_index: VectorIndexConfig,
    /// Relational store and blob storage configuration
    pub storage: StorageConfig,
    /// Summary generation configuration
    pub summary: SummaryConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file (if present) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<RagConfig>(&content).map_err(|e| {
                    Error::Config(format!("Invalid config file {}: {}", path.display(), e))
                })?
            }
            Some(path) => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                RagConfig::default()
            }
            None => RagConfig::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply secrets and endpoints from the environment
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(key) = std::env::var("PINECONE_API_KEY") {
            self.vector_index.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("PINECONE_INDEX_URL") {
            self.vector_index.index_url = Some(url);
        }
        if let Ok(path) = std::env::var("LEXRAG_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_tokens == 0 {
            return Err(Error::Config("chunking.max_tokens must be greater than 0".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(Error::Config(
                "retrieval.similarity_threshold must be within [0, 1]".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be greater than 0".into()));
        }
        if self.vector_index.backend == VectorIndexBackend::Pinecone
            && self.vector_index.index_url.is_none()
        {
            return Err(Error::Config(
                "vector_index.backend = pinecone requires index_url (or PINECONE_INDEX_URL)".into(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 25MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 25 * 1024 * 1024,
        }
    }
}

/// Text extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// How PDFs are turned into text
    pub pdf_mode: PdfMode,
    /// Minimum sanitized text length (characters) accepted for chunking.
    /// 100 in the ingestion flow; some callers run with 50.
    pub min_text_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdf_mode: PdfMode::default(),
            min_text_length: 100,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Token budget per chunk (estimated)
    pub max_tokens: usize,
    /// Sentences carried over from the previous chunk
    pub overlap_sentences: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 800,
            overlap_sentences: 2,
        }
    }
}

/// OpenAI-compatible embedding and chat completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL
    pub base_url: String,
    /// API key (usually from OPENAI_API_KEY)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Embedding model name
    pub embed_model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Chat completion model name
    pub chat_model: String,
    /// Temperature for question answering
    pub temperature: f32,
    /// Completion token limit for question answering
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            embed_model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Matches requested from the vector index
    pub top_k: usize,
    /// Matches must score strictly above this to be used as context.
    /// Raising it trades recall for precision.
    pub similarity_threshold: f32,
    /// Characters of chunk text shown in each source preview
    pub preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.5,
            preview_chars: 200,
        }
    }
}

/// Vector index backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorIndexBackend {
    /// In-process brute-force index (development and tests)
    #[default]
    Memory,
    /// Pinecone REST API
    Pinecone,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    /// Backend provider
    pub backend: VectorIndexBackend,
    /// Index host URL (Pinecone)
    pub index_url: Option<String>,
    /// API key (usually from PINECONE_API_KEY)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Vectors per upsert request
    pub upsert_batch_size: usize,
    /// Characters of chunk text stored in vector metadata
    pub metadata_text_limit: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: VectorIndexBackend::Memory,
            index_url: None,
            api_key: None,
            upsert_batch_size: 100,
            metadata_text_limit: 1000,
        }
    }
}

/// Relational store and blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Root directory for uploaded document bytes
    pub blob_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexrag");

        Self {
            database_path: data_dir.join("lexrag.db"),
            blob_dir: data_dir.join("documents"),
        }
    }
}

/// Summary generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Characters of document text sent for analysis
    pub max_input_chars: usize,
    /// Temperature for analysis
    pub temperature: f32,
    /// Completion token limit for analysis
    pub max_tokens: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 8000,
            temperature: 0.3,
            max_tokens: 1500,
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Concurrent embedding requests per document (1 = strictly sequential)
    pub embedding_concurrency: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            embedding_concurrency: 1,
        }
    }
}
