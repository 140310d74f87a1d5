//! API error type and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use dqjobs_core::JobError;
use dqjobs_protocols::SchedulerError;

use crate::message::OperationMessage;

/// A failed request, optionally tagged with the operation that failed.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ApiError {
    source: JobError,
    operation: Option<OperationMessage>,
}

impl ApiError {
    /// Tag errors of a mutating endpoint with its failure message.
    pub fn failed(operation: OperationMessage) -> impl FnOnce(JobError) -> Self {
        move |source| Self {
            source,
            operation: Some(operation),
        }
    }

    pub fn status(&self) -> StatusCode {
        match &self.source {
            JobError::Validation(_)
            | JobError::Scheduler(
                SchedulerError::InvalidSchedule(_) | SchedulerError::InvalidTimeZone(_),
            ) => StatusCode::BAD_REQUEST,
            JobError::NotFound(_) => StatusCode::NOT_FOUND,
            JobError::RemoteService(_) => StatusCode::BAD_GATEWAY,
            JobError::Scheduler(_) | JobError::DataFormat(_) | JobError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JobError> for ApiError {
    fn from(source: JobError) -> Self {
        Self {
            source,
            operation: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.source.to_string();
        let body = match self.operation {
            Some(operation) => json!({
                "code": operation.code,
                "description": operation.description,
                "error": error,
            }),
            None => json!({ "error": error }),
        };
        (status, Json(body)).into_response()
    }
}
