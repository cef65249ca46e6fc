// Notebook artifact staging
// Layout inside the bucket: <stem>/<stem>.<ext> plus the sidecar pointer <stem>/<stem>.json

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::errors::ArtifactStagingError;
use crate::models::artifact_stem;
use crate::storage::{gcs_uri, ObjectStore};
use crate::telemetry;

const NOTEBOOK_CONTENT_TYPE: &str = "application/x-ipynb+json";
const SIDECAR_CONTENT_TYPE: &str = "application/json";

/// Where a staged notebook landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub bucket: String,
    pub folder: String,
    pub object: String,
    pub uri: String,
    pub sidecar_uri: String,
}

#[derive(Serialize)]
struct SidecarPointer<'a> {
    uri: &'a str,
}

/// Uploads local notebooks (and their pointer files) ahead of schedule creation
#[derive(Clone)]
pub struct ArtifactStager {
    store: Arc<dyn ObjectStore>,
    notebook_root: PathBuf,
}

impl ArtifactStager {
    pub fn new(store: Arc<dyn ObjectStore>, notebook_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            notebook_root: notebook_root.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Create the bucket unless it already exists
    #[instrument(skip(self))]
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<(), ArtifactStagingError> {
        if self.store.bucket_exists(bucket).await? {
            return Ok(());
        }
        info!(bucket = %bucket, "Bucket missing, creating it");
        self.store.create_bucket(bucket).await.inspect_err(|e| {
            error!(error = %e, bucket = %bucket, "Bucket provisioning failed");
        })
    }

    /// Upload the notebook and its sidecar pointer into `bucket`
    #[instrument(skip(self))]
    pub async fn stage(
        &self,
        bucket: &str,
        input_filename: &str,
    ) -> Result<ArtifactRef, ArtifactStagingError> {
        let layout = ArtifactLayout::for_input(input_filename)?;
        let local_path = self.resolve(input_filename);

        let data = tokio::fs::read(&local_path).await.map_err(|e| {
            error!(error = %e, path = %local_path.display(), "Failed to read notebook");
            ArtifactStagingError::ReadFailed {
                path: local_path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        let content_type = if layout.extension.as_deref() == Some("ipynb") {
            NOTEBOOK_CONTENT_TYPE
        } else {
            "application/octet-stream"
        };

        let uri = self
            .store
            .upload(bucket, &layout.object, data, content_type)
            .await?;
        telemetry::record_artifact_upload(bucket);

        let pointer = serde_json::to_vec_pretty(&SidecarPointer { uri: &uri }).map_err(|e| {
            ArtifactStagingError::UploadFailed {
                bucket: bucket.to_string(),
                object: layout.sidecar.clone(),
                message: e.to_string(),
            }
        })?;
        let sidecar_uri = self
            .store
            .upload(bucket, &layout.sidecar, pointer, SIDECAR_CONTENT_TYPE)
            .await?;

        info!(uri = %uri, sidecar = %sidecar_uri, "Notebook staged");
        Ok(ArtifactRef {
            bucket: bucket.to_string(),
            folder: layout.folder,
            object: layout.object,
            uri,
            sidecar_uri,
        })
    }

    fn resolve(&self, input_filename: &str) -> PathBuf {
        let path = Path::new(input_filename);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.notebook_root.join(path)
        }
    }
}

/// Object names derived from the input file name
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArtifactLayout {
    folder: String,
    object: String,
    sidecar: String,
    extension: Option<String>,
}

impl ArtifactLayout {
    fn for_input(input_filename: &str) -> Result<Self, ArtifactStagingError> {
        let invalid = || ArtifactStagingError::InvalidArtifactPath(input_filename.to_string());

        let stem = artifact_stem(input_filename).ok_or_else(invalid)?;
        let extension = Path::new(input_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);

        // The sidecar would overwrite the artifact itself
        if extension.as_deref() == Some("json") {
            return Err(invalid());
        }

        let file_name = match &extension {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem.to_string(),
        };

        Ok(Self {
            folder: stem.to_string(),
            object: format!("{}/{}", stem, file_name),
            sidecar: format!("{}/{}.json", stem, stem),
            extension,
        })
    }
}

/// Output location for a notebook's executions
pub fn output_uri(bucket: &str, folder: &str) -> String {
    gcs_uri(bucket, folder)
}
