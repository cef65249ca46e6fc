// Cloud Storage JSON API adapter
// Bucket probing/creation, media uploads and bucket listing over the shared transport.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::credentials::auth_headers;
use crate::errors::ArtifactStagingError;
use crate::models::Credentials;
use crate::pagination::{PageCursor, DEFAULT_MAX_PAGES};
use crate::storage::{gcs_uri, ObjectStore};
use crate::transport::{Transport, TransportRequest, TransportResponse};

pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Cloud Storage client bound to one set of credentials
#[derive(Clone)]
pub struct GcsObjectStore {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    base_url: String,
    max_pages: usize,
}

#[derive(Debug, Default, Deserialize)]
struct BucketList {
    #[serde(default)]
    items: Option<Vec<BucketResource>>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BucketResource {
    name: String,
}

impl GcsObjectStore {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        base_url: Option<String>,
    ) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_STORAGE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            transport,
            credentials,
            base_url,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/storage/v1/b/{}", self.base_url, bucket)
    }

    fn buckets_url(&self) -> String {
        format!("{}/storage/v1/b", self.base_url)
    }

    fn upload_url(&self, bucket: &str) -> String {
        format!("{}/upload/storage/v1/b/{}/o", self.base_url, bucket)
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, String> {
        self.transport
            .send(request.headers(auth_headers(&self.credentials)))
            .await
            .map_err(|e| e.to_string())
    }
}

fn describe_failure(response: &TransportResponse) -> String {
    format!("{} {} {}", response.status, response.reason, response.text)
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    #[instrument(skip(self))]
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ArtifactStagingError> {
        let response = self
            .send(TransportRequest::get(self.bucket_url(bucket)))
            .await
            .map_err(|message| ArtifactStagingError::BucketCheckFailed {
                bucket: bucket.to_string(),
                message,
            })?;

        match response.status {
            200 => Ok(true),
            404 => {
                debug!(bucket = %bucket, "Bucket does not exist");
                Ok(false)
            }
            _ => {
                error!(bucket = %bucket, status = response.status, "Failed to check bucket");
                Err(ArtifactStagingError::BucketCheckFailed {
                    bucket: bucket.to_string(),
                    message: describe_failure(&response),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn create_bucket(&self, bucket: &str) -> Result<(), ArtifactStagingError> {
        let request = TransportRequest::post(self.buckets_url())
            .query("project", self.credentials.project_id())
            .json(json!({
                "name": bucket,
                "location": self.credentials.region_id(),
            }));

        let response =
            self.send(request)
                .await
                .map_err(|message| ArtifactStagingError::BucketCreateFailed {
                    bucket: bucket.to_string(),
                    message,
                })?;

        if !response.is_success() {
            error!(bucket = %bucket, status = response.status, "Failed to create bucket");
            return Err(ArtifactStagingError::BucketCreateFailed {
                bucket: bucket.to_string(),
                message: describe_failure(&response),
            });
        }

        info!(bucket = %bucket, "Bucket created");
        Ok(())
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ArtifactStagingError> {
        let request = TransportRequest::post(self.upload_url(bucket))
            .query("uploadType", "media")
            .query("name", object)
            .bytes(data, content_type);

        let upload_failed = |message: String| ArtifactStagingError::UploadFailed {
            bucket: bucket.to_string(),
            object: object.to_string(),
            message,
        };

        let response = self.send(request).await.map_err(upload_failed)?;
        if !response.is_success() {
            error!(bucket = %bucket, object = %object, status = response.status, "Upload failed");
            return Err(upload_failed(describe_failure(&response)));
        }

        let uri = gcs_uri(bucket, object);
        debug!(uri = %uri, "Object uploaded");
        Ok(uri)
    }

    #[instrument(skip(self))]
    async fn list_buckets(&self) -> Result<Vec<String>, ArtifactStagingError> {
        let mut names = Vec::new();
        let mut cursor = PageCursor::new(self.max_pages);

        loop {
            let mut request = TransportRequest::get(self.buckets_url())
                .query("project", self.credentials.project_id());
            if let Some(token) = cursor.token() {
                request = request.query("pageToken", token);
            }

            let response = self
                .send(request)
                .await
                .map_err(ArtifactStagingError::ListFailed)?;
            if !response.is_success() {
                error!(status = response.status, "Failed to list buckets");
                return Err(ArtifactStagingError::ListFailed(describe_failure(
                    &response,
                )));
            }

            let page: BucketList = if response.text.trim().is_empty() {
                BucketList::default()
            } else {
                serde_json::from_str(&response.text)
                    .map_err(|e| ArtifactStagingError::ListFailed(e.to_string()))?
            };
            names.extend(
                page.items
                    .unwrap_or_default()
                    .into_iter()
                    .map(|bucket| bucket.name),
            );

            let more = cursor.advance(page.next_page_token).map_err(|e| {
                error!(error = %e, "Bucket listing did not terminate");
                ArtifactStagingError::ListFailed(e.to_string())
            })?;
            if !more {
                break;
            }
        }

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpTransport;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> GcsObjectStore {
        GcsObjectStore::new(
            Arc::new(HttpTransport::new(5).unwrap()),
            Credentials::new("tok", "demo-project", "us-central1").unwrap(),
            Some(server.uri()),
        )
    }

    #[tokio::test]
    async fn test_bucket_exists_maps_404_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/present"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "present"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/absent"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = store(&server);
        assert!(store.bucket_exists("present").await.unwrap());
        assert!(!store.bucket_exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn test_bucket_check_forbidden_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let err = store(&server).bucket_exists("locked").await.unwrap_err();
        assert!(matches!(err, ArtifactStagingError::BucketCheckFailed { .. }));
        assert!(err.to_string().contains("denied"));
    }

    #[tokio::test]
    async fn test_create_bucket_posts_name_and_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/b"))
            .and(query_param("project", "demo-project"))
            .and(body_json(json!({"name": "fresh", "location": "us-central1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "fresh"})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).create_bucket("fresh").await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_returns_gs_uri() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/fresh/o"))
            .and(query_param("uploadType", "media"))
            .and(query_param("name", "nb/nb.ipynb"))
            .and(header("Content-Type", "application/x-ipynb+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "nb/nb.ipynb"})))
            .expect(1)
            .mount(&server)
            .await;

        let uri = store(&server)
            .upload("fresh", "nb/nb.ipynb", b"{}".to_vec(), "application/x-ipynb+json")
            .await
            .unwrap();
        assert_eq!(uri, "gs://fresh/nb/nb.ipynb");
    }

    #[tokio::test]
    async fn test_list_buckets_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .and(query_param("pageToken", "p2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"name": "c"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "a"}, {"name": "b"}],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;

        let names = store(&server).list_buckets().await.unwrap();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_list_buckets_stops_on_repeated_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "a"}],
                "nextPageToken": "same"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = store(&server).list_buckets().await.unwrap_err();
        assert!(matches!(err, ArtifactStagingError::ListFailed(_)));
        assert!(err.to_string().contains("same"));
    }

    #[tokio::test]
    async fn test_list_buckets_respects_page_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "b"}],
                "nextPageToken": "p3"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "a"}],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;

        let err = store(&server).with_max_pages(2).list_buckets().await.unwrap_err();
        assert!(err.to_string().contains("2 pages"));
    }

    #[tokio::test]
    async fn test_list_buckets_null_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": null})))
            .mount(&server)
            .await;

        assert!(store(&server).list_buckets().await.unwrap().is_empty());
    }
}
