//! Provider abstractions for embeddings, chat completion, vector indexing and blob storage
//!
//! Traits keep the pipeline independent of the hosted services; the
//! in-process implementations back development setups and tests.

pub mod blob_store;
pub mod chat;
pub mod embedding;
pub mod local;
pub mod openai;
pub mod pinecone;
pub mod vector_index;

pub use blob_store::BlobStore;
pub use chat::{ChatOptions, ChatProvider};
pub use embedding::EmbeddingProvider;
pub use local::{InMemoryVectorIndex, LocalBlobStore};
pub use openai::OpenAiClient;
pub use pinecone::PineconeIndex;
pub use vector_index::{VectorIndexProvider, VectorMatch, VectorMetadata, VectorRecord};

#[cfg(test)]
pub use blob_store::MockBlobStore;
#[cfg(test)]
pub use chat::MockChatProvider;
#[cfg(test)]
pub use embedding::MockEmbeddingProvider;
#[cfg(test)]
pub use vector_index::MockVectorIndexProvider;
