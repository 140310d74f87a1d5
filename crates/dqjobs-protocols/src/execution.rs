//! Remote execution service contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;
use crate::instance::SessionState;
use crate::job::JobSchedule;
use crate::measure::Measure;

/// Everything the remote side needs to run one measurement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Display name of the remote session.
    pub name: String,
    pub measure: Measure,
    pub schedule: JobSchedule,
}

/// Session state as reported by the remote service.
///
/// Every field is optional: the service may omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub id: Option<i64>,
    pub state: Option<SessionState>,
    pub app_id: Option<String>,
    pub app_uri: Option<String>,
}

#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<RemoteSession, ExecutionError>;

    async fn session_status(&self, session_id: i64) -> Result<RemoteSession, ExecutionError>;
}
