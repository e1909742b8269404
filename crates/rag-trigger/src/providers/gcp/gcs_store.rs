//! Google Cloud Storage object store
//!
//! Existence checks, server-side copies and deletes between buckets.

use async_trait::async_trait;

use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::copy::CopyObjectRequest;
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::Error as GcsError;

use crate::error::{Error, Result};
use crate::providers::object_store::ObjectStoreProvider;

/// Google Cloud Storage object store
pub struct GcsObjectStore {
    client: GcsClient,
}

impl GcsObjectStore {
    /// Create a client using Application Default Credentials
    pub async fn new() -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::Config(format!("Failed to create GCS client: {}", e)))?;

        Ok(Self {
            client: GcsClient::new(config),
        })
    }
}

fn is_not_found(err: &GcsError) -> bool {
    matches!(err, GcsError::Response(response) if response.code == 404)
}

#[async_trait]
impl ObjectStoreProvider for GcsObjectStore {
    async fn exists(&self, bucket: &str, name: &str) -> Result<bool> {
        match self
            .client
            .get_object(&GetObjectRequest {
                bucket: bucket.to_string(),
                object: name.to_string(),
                ..Default::default()
            })
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(Error::storage(format!(
                "Failed to stat gs://{}/{}: {}",
                bucket, name, e
            ))),
        }
    }

    async fn copy(
        &self,
        source_bucket: &str,
        name: &str,
        destination_bucket: &str,
    ) -> Result<()> {
        self.client
            .copy_object(&CopyObjectRequest {
                source_bucket: source_bucket.to_string(),
                source_object: name.to_string(),
                destination_bucket: destination_bucket.to_string(),
                destination_object: name.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| match e {
                e if is_not_found(&e) => Error::object_not_found(source_bucket, name),
                e => Error::storage(format!(
                    "Failed to copy gs://{}/{} to gs://{}/{}: {}",
                    source_bucket, name, destination_bucket, name, e
                )),
            })?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<()> {
        self.client
            .delete_object(&DeleteObjectRequest {
                bucket: bucket.to_string(),
                object: name.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| match e {
                e if is_not_found(&e) => Error::object_not_found(bucket, name),
                e => Error::storage(format!("Failed to delete gs://{}/{}: {}", bucket, name, e)),
            })
    }

    fn name(&self) -> &str {
        "gcs"
    }
}
