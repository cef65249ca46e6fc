use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;

use crate::handlers::{failure, required_param, ErrorResponse};
use crate::state::AppState;
use common::errors::ValidationError;
use common::models::OperationAck;

/// Request to create a new bucket
#[derive(Debug, Deserialize)]
pub struct CreateBucketRequest {
    pub bucket_name: Option<String>,
}

/// Buckets visible to the configured project
#[tracing::instrument(skip(state))]
pub async fn list_buckets(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ErrorResponse> {
    let result = async { state.schedule_client().await?.list_buckets().await }.await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "listing buckets", e))
}

#[tracing::instrument(skip(state, body))]
pub async fn create_new_bucket(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<OperationAck>, ErrorResponse> {
    let result = async {
        let request: CreateBucketRequest =
            serde_json::from_slice(&body).map_err(ValidationError::from)?;
        let bucket_name = required_param(request.bucket_name, "bucket_name")?;
        state
            .schedule_client()
            .await?
            .create_bucket(&bucket_name)
            .await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "creating the bucket", e))
}
