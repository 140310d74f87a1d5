//! Trigger engine contract.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Identity of a trigger: name unique within its group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerKey {
    pub name: String,
    pub group: String,
}

impl TriggerKey {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }

    /// Job key sharing this trigger's name and group.
    pub fn job_key(&self) -> JobKey {
        JobKey::new(self.name.clone(), self.group.clone())
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

/// Identity of a scheduler job. One job key may own several triggers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub name: String,
    pub group: String,
}

impl JobKey {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSpec {
    pub expression: String,
    pub time_zone: String,
}

impl CronSpec {
    pub fn new(expression: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            time_zone: time_zone.into(),
        }
    }
}

/// When a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
    /// Recurring cron schedule.
    Cron(CronSpec),
    /// Fires once at the given instant (immediately if already past).
    Once(DateTime<Utc>),
}

/// Payload handed back to the [`TriggerHandler`] when a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FireContext {
    /// The primary cron trigger of a job fired.
    Schedule { job_id: i64, schedule_id: i64 },
    /// The one-shot predicate trigger of an instance fired.
    Predicate { instance_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    Normal,
    Paused,
    Complete,
    Error,
    Blocked,
    None,
}

impl TriggerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerState::Normal => "NORMAL",
            TriggerState::Paused => "PAUSED",
            TriggerState::Complete => "COMPLETE",
            TriggerState::Error => "ERROR",
            TriggerState::Blocked => "BLOCKED",
            TriggerState::None => "NONE",
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one registered trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerInfo {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub state: TriggerState,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    /// Set only for cron triggers.
    pub cron_expression: Option<String>,
}

/// Trigger/cron engine.
#[async_trait]
pub trait SchedulerAdapter: Send + Sync {
    async fn check_exists(&self, key: &TriggerKey) -> Result<bool, SchedulerError>;

    /// Register a trigger for `job_key`. Fails with
    /// [`SchedulerError::TriggerExists`] when the trigger key is taken.
    async fn schedule(
        &self,
        job_key: JobKey,
        trigger_key: TriggerKey,
        spec: TriggerSpec,
        context: FireContext,
    ) -> Result<(), SchedulerError>;

    /// Pause every trigger of the job. Returns `false` when the job key is
    /// unknown to the engine.
    async fn pause_job(&self, job_key: &JobKey) -> Result<bool, SchedulerError>;

    async fn triggers_of_job(&self, job_key: &JobKey) -> Result<Vec<TriggerInfo>, SchedulerError>;
}

/// Callback the engine invokes on each firing.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    async fn on_fire(&self, context: FireContext);
}
