//! Blob store trait for uploaded document bytes

use async_trait::async_trait;

use crate::error::Result;

/// Trait for storing raw document files by path
///
/// Implementations:
/// - `LocalBlobStore`: Local filesystem
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`, replacing any existing object
    async fn upload(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Fetch the bytes stored at `path`
    ///
    /// Missing objects are reported as `Error::Storage`.
    async fn download(&self, path: &str) -> Result<Vec<u8>>;

    /// Remove the object at `path`; missing objects are not an error
    async fn delete(&self, path: &str) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
