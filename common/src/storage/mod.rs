// Storage module: object store seam, Cloud Storage adapter and notebook artifact staging

pub mod gcs;
pub mod stager;

pub use gcs::GcsObjectStore;
pub use stager::{ArtifactRef, ArtifactStager};

use async_trait::async_trait;

use crate::errors::ArtifactStagingError;

/// Bucket and object operations needed to stage notebooks
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ArtifactStagingError>;

    async fn create_bucket(&self, bucket: &str) -> Result<(), ArtifactStagingError>;

    /// Upload `data` as `object` and return its `gs://` URI
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ArtifactStagingError>;

    async fn list_buckets(&self) -> Result<Vec<String>, ArtifactStagingError>;
}

/// `gs://bucket/object`
pub fn gcs_uri(bucket: &str, object: &str) -> String {
    format!("gs://{}/{}", bucket, object)
}
