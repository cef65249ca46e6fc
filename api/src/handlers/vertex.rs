use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::handlers::{failure, required_param, ErrorResponse};
use crate::state::AppState;
use common::errors::{ValidationError, VertexError};
use common::models::{ExecutionJobRecord, MachineOption, Schedule, ScheduleList};
use common::vertex::OperationOutcome;

#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub region_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSchedulesQuery {
    pub region_id: Option<String>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub region_id: Option<String>,
    pub schedule_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionJobsQuery {
    pub region_id: Option<String>,
    pub schedule_id: Option<String>,
    pub start_date: Option<String>,
}

impl ScheduleQuery {
    fn into_parts(self) -> Result<(String, String), VertexError> {
        Ok((
            required_param(self.region_id, "region_id")?,
            required_param(self.schedule_id, "schedule_id")?,
        ))
    }
}

/// `start_date` is an ISO timestamp picked in the month calendar; the
/// browser sends the literal `null` when nothing is selected
fn parse_month(start_date: Option<String>) -> Result<Option<DateTime<Utc>>, VertexError> {
    match start_date.as_deref().map(str::trim) {
        None | Some("") | Some("null") | Some("undefined") => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|e| {
                ValidationError::InvalidFieldValue {
                    field: "start_date".to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
    }
}

/// Machine types and accelerators for the create form
#[tracing::instrument(skip(state))]
pub async fn ui_config(
    State(state): State<AppState>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<Vec<MachineOption>>, ErrorResponse> {
    let result = async {
        let region = required_param(query.region_id, "region_id")?;
        state.schedule_client().await?.list_ui_config(&region).await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "fetching ui config", e))
}

/// Stage the notebook and register a new schedule
#[tracing::instrument(skip(state, body))]
pub async fn create_job_scheduler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Schedule>, ErrorResponse> {
    let result = async {
        let payload: Value = serde_json::from_slice(&body).map_err(ValidationError::from)?;
        state
            .schedule_client()
            .await?
            .create_from_value(&payload)
            .await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "creating job schedule", e))
}

#[tracing::instrument(skip(state))]
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ListSchedulesQuery>,
) -> Result<Json<ScheduleList>, ErrorResponse> {
    let result = async {
        let region = required_param(query.region_id, "region_id")?;
        state
            .schedule_client()
            .await?
            .list_schedules(&region, query.next_page_token.as_deref())
            .await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "fetching list of schedules", e))
}

#[tracing::instrument(skip(state))]
pub async fn get_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Schedule>, ErrorResponse> {
    let result = async {
        let (region, schedule_id) = query.into_parts()?;
        state
            .schedule_client()
            .await?
            .get_schedule(&region, &schedule_id)
            .await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "getting the schedule", e))
}

#[tracing::instrument(skip(state))]
pub async fn pause_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<OperationOutcome>, ErrorResponse> {
    let result = async {
        let (region, schedule_id) = query.into_parts()?;
        state
            .schedule_client()
            .await?
            .pause_schedule(&region, &schedule_id)
            .await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "pausing the schedule", e))
}

#[tracing::instrument(skip(state))]
pub async fn resume_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<OperationOutcome>, ErrorResponse> {
    let result = async {
        let (region, schedule_id) = query.into_parts()?;
        state
            .schedule_client()
            .await?
            .resume_schedule(&region, &schedule_id)
            .await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "resuming the schedule", e))
}

#[tracing::instrument(skip(state))]
pub async fn delete_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<OperationOutcome>, ErrorResponse> {
    let result = async {
        let (region, schedule_id) = query.into_parts()?;
        state
            .schedule_client()
            .await?
            .delete_schedule(&region, &schedule_id)
            .await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "deleting the schedule", e))
}

/// Run a schedule once, outside its cron
#[tracing::instrument(skip(state))]
pub async fn trigger_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Value>, ErrorResponse> {
    let result = async {
        let (region, schedule_id) = query.into_parts()?;
        state
            .schedule_client()
            .await?
            .trigger_schedule(&region, &schedule_id)
            .await
    }
    .await;
    result
        .map(Json)
        .map_err(|e| failure(state.strict_status_codes(), "triggering the schedule", e))
}

/// Execution history of one schedule, optionally for a single month
#[tracing::instrument(skip(state))]
pub async fn list_notebook_execution_jobs(
    State(state): State<AppState>,
    Query(query): Query<ExecutionJobsQuery>,
) -> Result<Json<Vec<ExecutionJobRecord>>, ErrorResponse> {
    let result = async {
        let region = required_param(query.region_id, "region_id")?;
        let schedule_id = required_param(query.schedule_id, "schedule_id")?;
        let month = parse_month(query.start_date)?;
        state
            .schedule_client()
            .await?
            .list_execution_jobs(&region, &schedule_id, month)
            .await
    }
    .await;
    result.map(Json).map_err(|e| {
        failure(
            state.strict_status_codes(),
            "fetching notebook execution jobs",
            e,
        )
    })
}
