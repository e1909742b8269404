//! Object store provider trait for bucket-addressed blob operations

use async_trait::async_trait;
use crate::error::Result;

/// Trait for object storage addressed by (bucket, name)
///
/// Implementations:
/// - `MemoryObjectStore`: In-process buckets used as a test double
/// - `GcsObjectStore`: Google Cloud Storage
#[async_trait]
pub trait ObjectStoreProvider: Send + Sync {
    /// Check if an object exists
    async fn exists(&self, bucket: &str, name: &str) -> Result<bool>;

    /// Copy an object, overwriting any object at the destination
    async fn copy(
        &self,
        source_bucket: &str,
        name: &str,
        destination_bucket: &str,
    ) -> Result<()>;

    /// Delete an object
    async fn delete(&self, bucket: &str, name: &str) -> Result<()>;

    /// Copy then delete the source.
    ///
    /// Not atomic: if the delete fails the object is left in both buckets.
    async fn move_object(
        &self,
        source_bucket: &str,
        name: &str,
        destination_bucket: &str,
    ) -> Result<()> {
        self.copy(source_bucket, name, destination_bucket).await?;
        tracing::info!("Successfully copied {} to {}", name, destination_bucket);
        self.delete(source_bucket, name).await?;
        tracing::info!("Successfully deleted {} from {}", name, source_bucket);
        Ok(())
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}
