//! Request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use dqjobs_core::{AliveJob, HealthInfo};
use dqjobs_protocols::{JobInstance, Measure, NewMeasure, ScheduleRequest};

use crate::error::ApiError;
use crate::message::OperationMessage;
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNameQuery {
    pub job_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancesQuery {
    /// Trigger group of the job; the configured job group when omitted.
    #[serde(default)]
    pub group: Option<String>,
    pub job_name: String,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub size: i64,
}

fn succeed(status: StatusCode, message: OperationMessage, id: Option<i64>) -> impl IntoResponse {
    let mut body = json!({
        "code": message.code,
        "description": message.description,
    });
    if let Some(id) = id {
        body["id"] = json!(id);
    }
    (status, Json(body))
}

/// GET /api/v1/jobs
pub async fn list_jobs(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<AliveJob>>, ApiError> {
    Ok(Json(state.lifecycle.alive_jobs().await?))
}

/// POST /api/v1/job
pub async fn create_job(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Creating job '{}' (cron: {})", request.job_name, request.cron_expression);
    let job = state
        .lifecycle
        .add_job(request)
        .await
        .map_err(ApiError::failed(OperationMessage::CREATE_JOB_FAILED))?;
    Ok(succeed(
        StatusCode::CREATED,
        OperationMessage::CREATE_JOB_SUCCEED,
        Some(job.id),
    ))
}

/// DELETE /api/v1/job?jobName=
pub async fn delete_job_by_name(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<JobNameQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .lifecycle
        .delete_job_by_name(&query.job_name)
        .await
        .map_err(ApiError::failed(OperationMessage::DELETE_JOB_FAILED))?;
    Ok(succeed(StatusCode::OK, OperationMessage::DELETE_JOB_SUCCEED, None))
}

/// DELETE /api/v1/job/{id}
pub async fn delete_job_by_id(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .lifecycle
        .delete_job_by_id(id)
        .await
        .map_err(ApiError::failed(OperationMessage::DELETE_JOB_FAILED))?;
    Ok(succeed(StatusCode::OK, OperationMessage::DELETE_JOB_SUCCEED, None))
}

/// GET /api/v1/jobs/instances
pub async fn list_instances(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<InstancesQuery>,
) -> Result<Json<Vec<JobInstance>>, ApiError> {
    let group = query
        .group
        .unwrap_or_else(|| state.lifecycle.group().to_string());
    let instances = state
        .lifecycle
        .find_instances_of_job(&group, &query.job_name, query.page, query.size)
        .await?;
    Ok(Json(instances))
}

/// GET /api/v1/job/health
pub async fn job_health(State(state): State<Arc<ApiState>>) -> Result<Json<HealthInfo>, ApiError> {
    Ok(Json(state.lifecycle.health_info().await?))
}

/// POST /api/v1/measure
pub async fn create_measure(
    State(state): State<Arc<ApiState>>,
    Json(measure): Json<NewMeasure>,
) -> Result<impl IntoResponse, ApiError> {
    let measure = state
        .lifecycle
        .register_measure(measure)
        .await
        .map_err(ApiError::failed(OperationMessage::CREATE_MEASURE_FAILED))?;
    Ok(succeed(
        StatusCode::CREATED,
        OperationMessage::CREATE_MEASURE_SUCCEED,
        Some(measure.id),
    ))
}

/// GET /api/v1/measures
pub async fn list_measures(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<Measure>>, ApiError> {
    Ok(Json(state.lifecycle.list_measures().await?))
}

/// DELETE /api/v1/measure/{id}
pub async fn delete_measure(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .lifecycle
        .retire_measure(id)
        .await
        .map_err(ApiError::failed(OperationMessage::DELETE_MEASURE_FAILED))?;
    Ok(succeed(StatusCode::OK, OperationMessage::DELETE_MEASURE_SUCCEED, None))
}

/// GET /healthz
pub async fn liveness(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "uptimeSecs": state.uptime().as_secs(),
    }))
}
