//! Job instances and remote session states.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::TriggerKey;

/// State of a remote execution session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Starting,
    Recovering,
    Idle,
    Running,
    Busy,
    ShuttingDown,
    Error,
    Dead,
    Killed,
    Success,
    Unknown,
    NotFound,
}

impl SessionState {
    pub const ALL: [SessionState; 13] = [
        SessionState::NotStarted,
        SessionState::Starting,
        SessionState::Recovering,
        SessionState::Idle,
        SessionState::Running,
        SessionState::Busy,
        SessionState::ShuttingDown,
        SessionState::Error,
        SessionState::Dead,
        SessionState::Killed,
        SessionState::Success,
        SessionState::Unknown,
        SessionState::NotFound,
    ];

    /// States the poller keeps reconciling.
    pub const ACTIVE: [SessionState; 6] = [
        SessionState::NotStarted,
        SessionState::Starting,
        SessionState::Recovering,
        SessionState::Idle,
        SessionState::Running,
        SessionState::Busy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::NotStarted => "not_started",
            SessionState::Starting => "starting",
            SessionState::Recovering => "recovering",
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Busy => "busy",
            SessionState::ShuttingDown => "shutting_down",
            SessionState::Error => "error",
            SessionState::Dead => "dead",
            SessionState::Killed => "killed",
            SessionState::Success => "success",
            SessionState::Unknown => "unknown",
            SessionState::NotFound => "not_found",
        }
    }

    /// Non-terminal: the remote session may still change state.
    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Successful or expected progress.
    pub fn is_healthy(&self) -> bool {
        !matches!(
            self,
            SessionState::Error
                | SessionState::Dead
                | SessionState::Killed
                | SessionState::ShuttingDown
                | SessionState::Unknown
                | SessionState::NotFound
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|state| state.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// One firing of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInstance {
    pub id: i64,
    pub job_id: i64,
    pub session_id: Option<i64>,
    pub state: SessionState,
    pub app_id: Option<String>,
    pub app_uri: Option<String>,
    /// Short-lived trigger that kicks off the remote submission.
    pub predicate_key: TriggerKey,
    pub timestamp: DateTime<Utc>,
    pub expire_timestamp: DateTime<Utc>,
    pub deleted: bool,
}

/// Instance row before persistence assigns an id.
#[derive(Debug, Clone)]
pub struct NewJobInstance {
    pub job_id: i64,
    pub state: SessionState,
    pub predicate_key: TriggerKey,
    pub timestamp: DateTime<Utc>,
    pub expire_timestamp: DateTime<Utc>,
}

/// Partial update applied by the poller or the launcher.
///
/// `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub session_id: Option<i64>,
    pub state: Option<SessionState>,
    pub app_id: Option<String>,
    pub app_uri: Option<String>,
}

impl SessionUpdate {
    pub fn state(state: SessionState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}
