//! Object storage module for photo blobs
//!
//! Provides the `ObjectStorage` seam the upload path writes through and a
//! MinIO/S3-compatible client implementing it.

mod minio_client;

use async_trait::async_trait;

use crate::core::error::Result;

pub use minio_client::MinIOClient;

/// Blob store operations the report creation saga needs.
///
/// Implementations must keep `delete_object` idempotent: compensation may
/// race with uploads that finish after the caller stopped waiting, so
/// deleting an absent key is a success, not an error.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    async fn delete_object(&self, key: &str) -> Result<()>;
}
