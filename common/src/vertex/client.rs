// Schedule lifecycle client for Vertex AI notebook execution schedules
//
// Every operation returns Result<T, VertexError>. Non-2xx statuses are logged
// here and handed back as RemoteOperationError values; nothing panics across
// the operation boundary.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::credentials::auth_headers;
use crate::errors::{RemoteOperationError, ValidationError, VertexError};
use crate::models::{
    is_valid_bucket_name, normalize_bucket, Credentials, CreateScheduleRequest,
    ExecutionJobRecord, JobDescription, MachineOption, OperationAck, RawCredentials, Schedule,
    ScheduleList,
};
use crate::pagination::{PageCursor, DEFAULT_MAX_PAGES};
use crate::retry::{NoRetry, RetryStrategy};
use crate::storage::stager::output_uri;
use crate::storage::{ArtifactStager, GcsObjectStore};
use crate::telemetry::{self, CallOutcome};
use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::vertex::endpoints::{validate_region, validate_schedule_id, Endpoints};
use crate::vertex::format;

pub const CONTENT_TYPE: &str = "application/json";

/// Remote operations, used for error messages, metrics and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListUiConfig,
    ListSchedules,
    GetSchedule,
    PauseSchedule,
    ResumeSchedule,
    DeleteSchedule,
    TriggerSchedule,
    CreateSchedule,
    ListExecutionJobs,
}

impl Operation {
    /// Fragment completing "Error …"
    pub fn description(&self) -> &'static str {
        match self {
            Operation::ListUiConfig => "fetching ui config",
            Operation::ListSchedules => "listing schedules",
            Operation::GetSchedule => "getting the schedule",
            Operation::PauseSchedule => "pausing the schedule",
            Operation::ResumeSchedule => "resuming the schedule",
            Operation::DeleteSchedule => "deleting the schedule",
            Operation::TriggerSchedule => "triggering the schedule",
            Operation::CreateSchedule => "creating the schedule",
            Operation::ListExecutionJobs => "listing notebook execution jobs",
        }
    }

    pub fn metric_name(&self) -> &'static str {
        match self {
            Operation::ListUiConfig => "list_ui_config",
            Operation::ListSchedules => "list_schedules",
            Operation::GetSchedule => "get_schedule",
            Operation::PauseSchedule => "pause_schedule",
            Operation::ResumeSchedule => "resume_schedule",
            Operation::DeleteSchedule => "delete_schedule",
            Operation::TriggerSchedule => "trigger_schedule",
            Operation::CreateSchedule => "create_schedule",
            Operation::ListExecutionJobs => "list_execution_jobs",
        }
    }

    /// Acknowledgment returned for a 204 response
    pub fn acknowledgment(&self) -> Option<&'static str> {
        match self {
            Operation::PauseSchedule => Some("Schedule paused successfully"),
            Operation::ResumeSchedule => Some("Schedule resumed successfully"),
            Operation::DeleteSchedule => Some("Schedule deleted successfully"),
            _ => None,
        }
    }

    /// Safe to repeat: reads plus the pause/resume state transitions
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Operation::ListUiConfig
                | Operation::ListSchedules
                | Operation::GetSchedule
                | Operation::PauseSchedule
                | Operation::ResumeSchedule
                | Operation::ListExecutionJobs
        )
    }
}

/// Result of a state transition: the remote body, or the 204 acknowledgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationOutcome {
    Ack(OperationAck),
    Body(Value),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionJobPage {
    #[serde(default)]
    notebook_execution_jobs: Option<Vec<ExecutionJobRecord>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Client for one request's worth of schedule operations
#[derive(Clone)]
pub struct ScheduleClient {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    retry: Arc<dyn RetryStrategy>,
    stager: Option<ArtifactStager>,
    notebook_root: PathBuf,
    max_pages: usize,
}

impl std::fmt::Debug for ScheduleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleClient")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.endpoints)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ScheduleClient {
    /// Validate credentials and bind them to a transport
    pub fn new(
        credentials: RawCredentials,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, VertexError> {
        let credentials = Credentials::try_from(credentials).inspect_err(|e| {
            error!(error = %e, "Missing required credentials");
        })?;

        Ok(Self {
            credentials,
            transport,
            endpoints: Endpoints::default(),
            retry: Arc::new(NoRetry),
            stager: None,
            notebook_root: PathBuf::from("."),
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_retry(mut self, retry: Arc<dyn RetryStrategy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_notebook_root(mut self, notebook_root: impl Into<PathBuf>) -> Self {
        self.notebook_root = notebook_root.into();
        self
    }

    /// Cap for paginated listings, including the default stager's bucket listing
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Replace the default Cloud Storage stager
    pub fn with_stager(mut self, stager: ArtifactStager) -> Self {
        self.stager = Some(stager);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Stager used by `create`; defaults to Cloud Storage over the same transport
    pub fn stager(&self) -> ArtifactStager {
        match &self.stager {
            Some(stager) => stager.clone(),
            None => ArtifactStager::new(
                Arc::new(
                    GcsObjectStore::new(
                        self.transport.clone(),
                        self.credentials.clone(),
                        self.endpoints.storage_base_url(),
                    )
                    .with_max_pages(self.max_pages),
                ),
                self.notebook_root.clone(),
            ),
        }
    }

    fn create_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), CONTENT_TYPE.to_string())];
        headers.extend(auth_headers(&self.credentials));
        headers
    }

    fn project(&self) -> &str {
        self.credentials.project_id()
    }

    /// Send one remote call, retrying idempotent operations when the policy allows
    async fn execute(
        &self,
        operation: Operation,
        request: TransportRequest,
    ) -> Result<TransportResponse, RemoteOperationError> {
        let request = request.headers(self.create_headers());
        let mut attempt = 0;

        loop {
            let started = Instant::now();
            let result = self.transport.send(request.clone()).await;
            let elapsed = started.elapsed().as_secs_f64();

            let failure = match result {
                Ok(response) if response.is_success() => {
                    telemetry::record_remote_call(
                        operation.metric_name(),
                        CallOutcome::Success,
                        elapsed,
                    );
                    return Ok(response);
                }
                Ok(response) => {
                    telemetry::record_remote_call(
                        operation.metric_name(),
                        CallOutcome::Failure,
                        elapsed,
                    );
                    RemoteOperationError::Status {
                        operation: operation.description().to_string(),
                        status: response.status,
                        reason: response.reason,
                        body: response.text,
                    }
                }
                Err(TransportError::Timeout(timeout_secs)) => {
                    telemetry::record_remote_call(
                        operation.metric_name(),
                        CallOutcome::Timeout,
                        elapsed,
                    );
                    RemoteOperationError::Timeout {
                        operation: operation.description().to_string(),
                        timeout_secs,
                    }
                }
                Err(TransportError::Request(message)) => {
                    telemetry::record_remote_call(
                        operation.metric_name(),
                        CallOutcome::Failure,
                        elapsed,
                    );
                    RemoteOperationError::Transport {
                        operation: operation.description().to_string(),
                        message,
                    }
                }
            };

            let retryable = operation.is_idempotent()
                && match &failure {
                    RemoteOperationError::Status { status, .. } => *status >= 500,
                    _ => true,
                };
            if retryable {
                if let Some(delay) = self.retry.next_delay(attempt) {
                    warn!(
                        operation = operation.metric_name(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Retrying remote operation"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
            }

            error!(
                operation = operation.metric_name(),
                error = %failure,
                "Remote operation failed"
            );
            return Err(failure);
        }
    }

    fn parse<T: DeserializeOwned>(
        operation: Operation,
        response: &TransportResponse,
    ) -> Result<T, RemoteOperationError> {
        response
            .json()
            .and_then(serde_json::from_value)
            .map_err(|e| {
                error!(operation = operation.metric_name(), error = %e, "Malformed response");
                RemoteOperationError::MalformedResponse {
                    operation: operation.description().to_string(),
                    message: e.to_string(),
                }
            })
    }

    fn outcome(
        operation: Operation,
        response: &TransportResponse,
    ) -> Result<OperationOutcome, RemoteOperationError> {
        match (response.status, operation.acknowledgment()) {
            (204, Some(message)) => Ok(OperationOutcome::Ack(OperationAck::new(message))),
            _ => Self::parse(operation, response).map(OperationOutcome::Body),
        }
    }

    fn malformed(operation: Operation, message: String) -> RemoteOperationError {
        error!(operation = operation.metric_name(), error = %message, "Malformed response");
        RemoteOperationError::MalformedResponse {
            operation: operation.description().to_string(),
            message,
        }
    }

    /// Machine and accelerator options offered in a region
    #[instrument(skip(self))]
    pub async fn list_ui_config(&self, region: &str) -> Result<Vec<MachineOption>, VertexError> {
        validate_region(region)?;
        let operation = Operation::ListUiConfig;
        let url = self.endpoints.ui_config(self.project(), region);

        let response = self.execute(operation, TransportRequest::get(url)).await?;
        let payload: Value = Self::parse(operation, &response)?;
        let options =
            format::machine_options(payload).map_err(|e| Self::malformed(operation, e))?;
        Ok(options)
    }

    /// One page of schedule summaries, newest first
    #[instrument(skip(self))]
    pub async fn list_schedules(
        &self,
        region: &str,
        page_token: Option<&str>,
    ) -> Result<ScheduleList, VertexError> {
        validate_region(region)?;
        let operation = Operation::ListSchedules;

        let mut request = TransportRequest::get(self.endpoints.schedules(self.project(), region))
            .query("orderBy", "createTime desc");
        if let Some(token) = page_token.filter(|token| !token.is_empty()) {
            request = request.query("pageToken", token);
        }

        let response = self.execute(operation, request).await?;
        let payload: Value = Self::parse(operation, &response)?;
        let list = format::schedule_list(payload).map_err(|e| Self::malformed(operation, e))?;
        Ok(list)
    }

    #[instrument(skip(self))]
    pub async fn get_schedule(
        &self,
        region: &str,
        schedule_id: &str,
    ) -> Result<Schedule, VertexError> {
        validate_region(region)?;
        validate_schedule_id(schedule_id)?;
        let operation = Operation::GetSchedule;
        let url = self.endpoints.schedule(self.project(), region, schedule_id);

        let response = self.execute(operation, TransportRequest::get(url)).await?;
        Ok(Self::parse(operation, &response)?)
    }

    #[instrument(skip(self))]
    pub async fn pause_schedule(
        &self,
        region: &str,
        schedule_id: &str,
    ) -> Result<OperationOutcome, VertexError> {
        self.transition(Operation::PauseSchedule, region, schedule_id)
            .await
    }

    #[instrument(skip(self))]
    pub async fn resume_schedule(
        &self,
        region: &str,
        schedule_id: &str,
    ) -> Result<OperationOutcome, VertexError> {
        self.transition(Operation::ResumeSchedule, region, schedule_id)
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_schedule(
        &self,
        region: &str,
        schedule_id: &str,
    ) -> Result<OperationOutcome, VertexError> {
        self.transition(Operation::DeleteSchedule, region, schedule_id)
            .await
    }

    async fn transition(
        &self,
        operation: Operation,
        region: &str,
        schedule_id: &str,
    ) -> Result<OperationOutcome, VertexError> {
        validate_region(region)?;
        validate_schedule_id(schedule_id)?;

        let project = self.project();
        let request = match operation {
            Operation::PauseSchedule => TransportRequest::post(self.endpoints.schedule_action(
                project,
                region,
                schedule_id,
                "pause",
            )),
            Operation::ResumeSchedule => TransportRequest::post(self.endpoints.schedule_action(
                project,
                region,
                schedule_id,
                "resume",
            )),
            _ => TransportRequest::delete(self.endpoints.schedule(project, region, schedule_id)),
        };

        let response = self.execute(operation, request).await?;
        let outcome = Self::outcome(operation, &response)?;
        info!(schedule_id = %schedule_id, operation = operation.metric_name(), "Schedule updated");
        Ok(outcome)
    }

    /// Run a schedule once by resubmitting its stored execution job template
    ///
    /// Read-then-act: a schedule edited between the two calls runs with the
    /// template that was read.
    #[instrument(skip(self))]
    pub async fn trigger_schedule(
        &self,
        region: &str,
        schedule_id: &str,
    ) -> Result<Value, VertexError> {
        let schedule = self.get_schedule(region, schedule_id).await?;
        let operation = Operation::TriggerSchedule;

        let template = schedule.execution_job_template().cloned().ok_or_else(|| {
            Self::malformed(
                operation,
                format!(
                    "schedule '{}' has no notebookExecutionJob template",
                    schedule_id
                ),
            )
        })?;

        let url = self
            .endpoints
            .notebook_execution_jobs(self.project(), region);
        let response = self
            .execute(operation, TransportRequest::post(url).json(template))
            .await?;

        info!(schedule_id = %schedule_id, "Schedule triggered");
        Ok(Self::parse(operation, &response)?)
    }

    /// Stage the notebook, then register the schedule that runs it
    #[instrument(skip(self, job), fields(display_name = %job.display_name, region = %job.region))]
    pub async fn create(&self, job: &JobDescription) -> Result<Schedule, VertexError> {
        validate_region(&job.region)?;
        let operation = Operation::CreateSchedule;
        let bucket = &job.cloud_storage_bucket;

        let stager = self.stager();
        stager.ensure_bucket(bucket).await?;
        let artifact = stager.stage(bucket, &job.input_filename).await?;

        let payload = CreateScheduleRequest::build(
            job,
            Endpoints::parent(self.project(), &job.region),
            artifact.uri.clone(),
            output_uri(bucket, &artifact.folder),
        );
        let body = serde_json::to_value(&payload)
            .map_err(|e| Self::malformed(operation, e.to_string()))?;

        let url = self.endpoints.schedules(self.project(), &job.region);
        let response = self
            .execute(operation, TransportRequest::post(url).json(body))
            .await?;
        let schedule: Schedule = Self::parse(operation, &response)?;

        info!(
            schedule = schedule.name.as_deref().unwrap_or_default(),
            artifact = %artifact.uri,
            "Schedule created"
        );
        Ok(schedule)
    }

    /// Validate a raw browser payload and create the schedule it describes
    pub async fn create_from_value(&self, payload: &Value) -> Result<Schedule, VertexError> {
        let job = JobDescription::from_value(payload)?;
        self.create(&job).await
    }

    /// Buckets visible to the project, for the bucket picker
    #[instrument(skip(self))]
    pub async fn list_buckets(&self) -> Result<Vec<String>, VertexError> {
        Ok(self.stager().store().list_buckets().await?)
    }

    #[instrument(skip(self))]
    pub async fn create_bucket(&self, bucket_name: &str) -> Result<OperationAck, VertexError> {
        let bucket = normalize_bucket(bucket_name);
        if bucket.is_empty() {
            return Err(ValidationError::MissingField("bucket_name".to_string()).into());
        }
        if !is_valid_bucket_name(&bucket) {
            return Err(ValidationError::InvalidFieldValue {
                field: "bucket_name".to_string(),
                reason: format!("'{}' is not a bucket name", bucket_name),
            }
            .into());
        }

        self.stager().store().create_bucket(&bucket).await?;
        Ok(OperationAck::new("Bucket created successfully"))
    }

    /// Execution jobs spawned by a schedule, optionally limited to one calendar month
    #[instrument(skip(self))]
    pub async fn list_execution_jobs(
        &self,
        region: &str,
        schedule_id: &str,
        month: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExecutionJobRecord>, VertexError> {
        validate_region(region)?;
        validate_schedule_id(schedule_id)?;
        let operation = Operation::ListExecutionJobs;

        let schedule_name = Endpoints::schedule_name(self.project(), region, schedule_id);
        let filter = format::execution_jobs_filter(
            &schedule_name,
            month.and_then(format::month_window),
        );
        let url = self
            .endpoints
            .notebook_execution_jobs(self.project(), region);

        let mut jobs = Vec::new();
        let mut cursor = PageCursor::new(self.max_pages);
        loop {
            let mut request = TransportRequest::get(url.clone())
                .query("filter", filter.clone())
                .query("orderBy", "createTime desc");
            if let Some(token) = cursor.token() {
                request = request.query("pageToken", token);
            }

            let response = self.execute(operation, request).await?;
            let page: ExecutionJobPage = Self::parse(operation, &response)?;
            jobs.extend(page.notebook_execution_jobs.unwrap_or_default());

            if !cursor
                .advance(page.next_page_token)
                .map_err(|e| Self::malformed(operation, e.to_string()))?
            {
                break;
            }
        }

        Ok(jobs)
    }
}
