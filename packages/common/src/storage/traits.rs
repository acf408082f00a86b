use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;

pub type BoxReader<'a> = Box<dyn AsyncRead + Unpin + Send + 'a>;

/// Blob storage keyed by the SHA-256 of the content.
///
/// Identical uploads collapse onto one blob, so callers must check that no
/// record still references a hash before calling [`BlobStore::delete`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        let reader: BoxReader<'_> = Box::new(data);
        self.put_stream(reader).await
    }

    /// Drain `reader` into the store and return the hash of what was written.
    async fn put_stream(&self, reader: BoxReader<'_>) -> Result<ContentHash, StorageError>;

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(hash).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader<'static>, StorageError>;

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
