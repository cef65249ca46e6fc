// Data models for credentials, job descriptions and the Vertex AI schedule wire schema

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ConfigurationError, FieldError, ValidationError};

/// Cron expression used when the caller leaves the schedule empty (every minute)
pub const DEFAULT_CRON_EXPRESSION: &str = "* * * * *";

// ============================================================================
// Credentials
// ============================================================================

/// Credentials as handed out by a credential provider; any field may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCredentials {
    pub access_token: Option<String>,
    pub project_id: Option<String>,
    pub region_id: Option<String>,
}

/// Validated credentials, immutable for the lifetime of a client
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
    project_id: String,
    region_id: String,
}

impl Credentials {
    pub fn new(
        access_token: impl Into<String>,
        project_id: impl Into<String>,
        region_id: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        Self::try_from(RawCredentials {
            access_token: Some(access_token.into()),
            project_id: Some(project_id.into()),
            region_id: Some(region_id.into()),
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region_id(&self) -> &str {
        &self.region_id
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("region_id", &self.region_id)
            .finish()
    }
}

impl TryFrom<RawCredentials> for Credentials {
    type Error = ConfigurationError;

    fn try_from(raw: RawCredentials) -> Result<Self, Self::Error> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let access_token = present(raw.access_token);
        let project_id = present(raw.project_id);
        let region_id = present(raw.region_id);

        match (access_token, project_id, region_id) {
            (Some(access_token), Some(project_id), Some(region_id)) => Ok(Self {
                access_token,
                project_id,
                region_id,
            }),
            (access_token, project_id, region_id) => {
                let missing = [
                    ("access_token", access_token.is_none()),
                    ("project_id", project_id.is_none()),
                    ("region_id", region_id.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(name, _)| name.to_string())
                .collect();
                Err(ConfigurationError::MissingCredentials(missing))
            }
        }
    }
}

// ============================================================================
// Job description (inbound create payload)
// ============================================================================

/// Everything needed to register a scheduled notebook execution
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescription {
    pub display_name: String,
    pub input_filename: String,
    pub machine_type: String,
    pub accelerator_type: Option<String>,
    pub accelerator_count: Option<u32>,
    pub kernel_name: String,
    pub schedule_value: String,
    pub time_zone: Tz,
    pub max_run_count: Option<u32>,
    pub region: String,
    pub cloud_storage_bucket: String,
    pub service_account: Option<String>,
    pub network: Option<String>,
    pub subnetwork: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl JobDescription {
    /// Build from the browser payload, reporting every invalid field at once
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let empty = Map::new();
        let (map, mut errors) = match value.as_object() {
            Some(map) => (map, Vec::new()),
            None => (
                &empty,
                vec![FieldError::new("body", "expected a JSON object")],
            ),
        };
        let mut fields = FieldReader {
            map,
            errors: &mut errors,
        };

        let display_name = fields.required_str("display_name");
        let input_filename = fields.required_str("input_filename");
        let machine_type = fields.required_str("machine_type");
        let accelerator_type = fields.optional_str("accelerator_type");
        let accelerator_count = fields.optional_count("accelerator_count");
        let kernel_name = fields.required_str("kernel_name");
        let schedule_value = fields.optional_str("schedule_value").unwrap_or_default();
        let time_zone = fields.time_zone("time_zone");
        let max_run_count = fields.optional_count("max_run_count");
        let region = fields.required_str("region");
        let cloud_storage_bucket = fields
            .required_str("cloud_storage_bucket")
            .map(|bucket| normalize_bucket(&bucket));
        let service_account = fields.optional_str("service_account");
        let network = fields.optional_str("network");
        let subnetwork = fields.optional_str("subnetwork");
        let start_time = fields.optional_timestamp("start_time");
        let end_time = fields.optional_timestamp("end_time");

        if let Some(filename) = &input_filename {
            if artifact_stem(filename).is_none() {
                errors.push(FieldError::new(
                    "input_filename",
                    format!("'{}' has no file name", filename),
                ));
            }
        }
        if let Some(bucket) = &cloud_storage_bucket {
            if !is_valid_bucket_name(bucket) {
                errors.push(FieldError::new(
                    "cloud_storage_bucket",
                    format!("'{}' is not a bucket name", bucket),
                ));
            }
        }
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if end < start {
                errors.push(FieldError::new("end_time", "must not precede start_time"));
            }
        }

        match (
            display_name,
            input_filename,
            machine_type,
            kernel_name,
            time_zone,
            region,
            cloud_storage_bucket,
        ) {
            (
                Some(display_name),
                Some(input_filename),
                Some(machine_type),
                Some(kernel_name),
                Some(time_zone),
                Some(region),
                Some(cloud_storage_bucket),
            ) if errors.is_empty() => Ok(Self {
                display_name,
                input_filename,
                machine_type,
                accelerator_type,
                accelerator_count,
                kernel_name,
                schedule_value,
                time_zone,
                max_run_count,
                region,
                cloud_storage_bucket,
                service_account,
                network,
                subnetwork,
                start_time,
                end_time,
            }),
            _ => Err(ValidationError::InvalidJobDescription(errors)),
        }
    }

    /// Cron string with explicit timezone prefix, e.g. `TZ=UTC 0 9 * * 1`
    pub fn cron(&self) -> String {
        let expression = match self.schedule_value.trim() {
            "" => DEFAULT_CRON_EXPRESSION,
            value => value,
        };
        format!("TZ={} {}", self.time_zone.name(), expression)
    }
}

/// Accepts `bucket`, `gs://bucket` and `gs://bucket/`
pub fn normalize_bucket(bucket: &str) -> String {
    bucket
        .trim()
        .trim_start_matches("gs://")
        .trim_end_matches('/')
        .to_string()
}

/// Cloud Storage naming rules: 3-63 chars of `[a-z0-9._-]`, alphanumeric at both ends
pub fn is_valid_bucket_name(bucket: &str) -> bool {
    let bytes = bucket.as_bytes();
    (3..=63).contains(&bytes.len())
        && bytes
            .iter()
            .all(|&b| {
                b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'_')
            })
        && bytes.first().is_some_and(u8::is_ascii_alphanumeric)
        && bytes.last().is_some_and(u8::is_ascii_alphanumeric)
}

/// File name without directory and extension
pub fn artifact_stem(path: &str) -> Option<&str> {
    std::path::Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
}

struct FieldReader<'a> {
    map: &'a Map<String, Value>,
    errors: &'a mut Vec<FieldError>,
}

impl FieldReader<'_> {
    fn raw(&self, field: &str) -> Option<&Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    fn required_str(&mut self, field: &str) -> Option<String> {
        match self.raw(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::String(_)) | None => {
                self.errors.push(FieldError::new(field, "required"));
                None
            }
            Some(_) => {
                self.errors.push(FieldError::new(field, "expected a string"));
                None
            }
        }
    }

    fn optional_str(&mut self, field: &str) -> Option<String> {
        match self.raw(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::String(_)) | None => None,
            Some(_) => {
                self.errors.push(FieldError::new(field, "expected a string"));
                None
            }
        }
    }

    fn optional_count(&mut self, field: &str) -> Option<u32> {
        let parsed = match self.raw(field) {
            None => return None,
            Some(Value::String(s)) if s.trim().is_empty() => return None,
            Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(_) => None,
        };
        if parsed.is_none() {
            self.errors
                .push(FieldError::new(field, "expected a non-negative integer"));
        }
        parsed
    }

    fn time_zone(&mut self, field: &str) -> Option<Tz> {
        let name = self.required_str(field)?;
        match name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                self.errors.push(FieldError::new(
                    field,
                    format!("unknown time zone '{}'", name),
                ));
                None
            }
        }
    }

    fn optional_timestamp(&mut self, field: &str) -> Option<DateTime<Utc>> {
        let value = self.optional_str(field)?;
        match DateTime::parse_from_rfc3339(&value) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                self.errors.push(FieldError::new(
                    field,
                    format!("expected an RFC 3339 timestamp: {}", e),
                ));
                None
            }
        }
    }
}

// ============================================================================
// UI configuration
// ============================================================================

/// One selectable machine shape for the create form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineOption {
    /// e.g. `n1-standard-2 (2 CPUs, 7.5 GB RAM)`
    pub machine_type: String,
    pub accelerator_configs: Value,
}

// ============================================================================
// Schedules (remote entity)
// ============================================================================

/// Schedule state as reported by Vertex AI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleState {
    Unspecified,
    Active,
    Paused,
    Completed,
    Other(String),
}

impl ScheduleState {
    pub fn from_wire(state: &str) -> Self {
        match state {
            "STATE_UNSPECIFIED" => ScheduleState::Unspecified,
            "ACTIVE" => ScheduleState::Active,
            "PAUSED" => ScheduleState::Paused,
            "COMPLETED" => ScheduleState::Completed,
            other => ScheduleState::Other(other.to_string()),
        }
    }
}

/// Full schedule record; unknown fields survive a round trip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_notebook_execution_job_request: Option<ExecutionJobTemplate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Schedule {
    /// Trailing segment of `projects/{p}/locations/{r}/schedules/{id}`
    pub fn schedule_id(&self) -> Option<&str> {
        self.name.as_deref().and_then(|name| name.rsplit('/').next())
    }

    pub fn state(&self) -> ScheduleState {
        self.state
            .as_deref()
            .map(ScheduleState::from_wire)
            .unwrap_or(ScheduleState::Unspecified)
    }

    /// Embedded `notebookExecutionJob`, exactly as stored remotely
    pub fn execution_job_template(&self) -> Option<&Value> {
        self.create_notebook_execution_job_request
            .as_ref()
            .and_then(|request| request.notebook_execution_job.as_ref())
    }

    pub fn summary(&self) -> ScheduleSummary {
        ScheduleSummary {
            display_name: self.display_name.clone(),
            schedule: self.cron.clone(),
            status: self.state.clone(),
        }
    }
}

/// `createNotebookExecutionJobRequest` as read back from a schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionJobTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notebook_execution_job: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reduced schedule shown in the listing table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub display_name: Option<String>,
    pub schedule: Option<String>,
    pub status: Option<String>,
}

/// One page of schedule summaries plus the remote pagination fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleList {
    pub schedules: Vec<ScheduleSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Synthetic acknowledgment for 204 responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationAck {
    pub message: String,
}

impl OperationAck {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Outbound create-schedule payload
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub display_name: String,
    pub cron: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_run_count: Option<String>,
    pub max_concurrent_run_count: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub create_notebook_execution_job_request: CreateNotebookExecutionJobRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotebookExecutionJobRequest {
    pub parent: String,
    pub notebook_execution_job: NotebookExecutionJob,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookExecutionJob {
    pub display_name: String,
    pub custom_environment_spec: CustomEnvironmentSpec,
    pub gcs_notebook_source: GcsNotebookSource,
    pub gcs_output_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    pub kernel_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEnvironmentSpec {
    pub machine_spec: MachineSpec,
    pub network_spec: NetworkSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    pub machine_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerator_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerator_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    pub enable_internet_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GcsNotebookSource {
    pub uri: String,
}

impl CreateScheduleRequest {
    /// Assemble the registration payload for a staged notebook
    pub fn build(
        job: &JobDescription,
        parent: String,
        artifact_uri: String,
        output_uri: String,
    ) -> Self {
        // Accelerator count without a type is rejected remotely
        let accelerator_count = job.accelerator_type.as_ref().and(job.accelerator_count);

        Self {
            display_name: job.display_name.clone(),
            cron: job.cron(),
            max_run_count: job.max_run_count.map(|n| n.to_string()),
            max_concurrent_run_count: "1".to_string(),
            start_time: job
                .start_time
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            end_time: job
                .end_time
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            create_notebook_execution_job_request: CreateNotebookExecutionJobRequest {
                parent,
                notebook_execution_job: NotebookExecutionJob {
                    display_name: job.display_name.clone(),
                    custom_environment_spec: CustomEnvironmentSpec {
                        machine_spec: MachineSpec {
                            machine_type: job.machine_type.clone(),
                            accelerator_type: job.accelerator_type.clone(),
                            accelerator_count,
                        },
                        network_spec: NetworkSpec {
                            enable_internet_access: true,
                            network: job.network.clone(),
                            subnetwork: job.subnetwork.clone(),
                        },
                    },
                    gcs_notebook_source: GcsNotebookSource { uri: artifact_uri },
                    gcs_output_uri: output_uri,
                    service_account: job.service_account.clone(),
                    kernel_name: job.kernel_name.clone(),
                },
            },
        }
    }
}

// ============================================================================
// Execution history
// ============================================================================

/// One notebook execution job spawned by a schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionJobRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs_output_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
