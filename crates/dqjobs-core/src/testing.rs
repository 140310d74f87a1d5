//! In-process fakes for the scheduler and execution service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use dqjobs_protocols::{
    DataConnector, ExecutionError, ExecutionService, FireContext, InstanceRepository, JobKey,
    JobRepository, Measure, MeasureCatalog, NewMeasure, RemoteSession, SchedulerAdapter,
    SchedulerError, SubmitRequest, TriggerInfo, TriggerKey, TriggerSpec, TriggerState,
};
use dqjobs_store_sqlite::SqliteStore;

/// A registered fake trigger.
#[derive(Debug, Clone)]
pub struct FakeTrigger {
    pub info: TriggerInfo,
    pub spec: TriggerSpec,
    pub context: FireContext,
}

/// Scheduler that records registrations without ever firing.
#[derive(Default)]
pub struct FakeScheduler {
    triggers: Mutex<HashMap<TriggerKey, FakeTrigger>>,
    fail_schedule: Mutex<bool>,
    fail_pause: Mutex<HashSet<JobKey>>,
    taken_groups: Mutex<HashSet<String>>,
}

impl FakeScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_schedule(&self) {
        *self.fail_schedule.lock() = true;
    }

    pub fn fail_pause_of(&self, job_key: JobKey) {
        self.fail_pause.lock().insert(job_key);
    }

    /// Report every key of `group` as already registered.
    pub fn take_group(&self, group: &str) {
        self.taken_groups.lock().insert(group.to_string());
    }

    pub fn trigger(&self, key: &TriggerKey) -> Option<FakeTrigger> {
        self.triggers.lock().get(key).cloned()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.lock().len()
    }

    /// Drop every trigger, as after a restart.
    pub fn clear(&self) {
        self.triggers.lock().clear();
    }

    pub fn state_of(&self, key: &TriggerKey) -> Option<TriggerState> {
        self.triggers.lock().get(key).map(|t| t.info.state)
    }
}

#[async_trait]
impl SchedulerAdapter for FakeScheduler {
    async fn check_exists(&self, key: &TriggerKey) -> Result<bool, SchedulerError> {
        if self.taken_groups.lock().contains(&key.group) {
            return Ok(true);
        }
        Ok(self.triggers.lock().contains_key(key))
    }

    async fn schedule(
        &self,
        job_key: JobKey,
        trigger_key: TriggerKey,
        spec: TriggerSpec,
        context: FireContext,
    ) -> Result<(), SchedulerError> {
        {
            let mut fail = self.fail_schedule.lock();
            if *fail {
                *fail = false;
                return Err(SchedulerError::Unavailable("scheduler offline".to_string()));
            }
        }
        let mut triggers = self.triggers.lock();
        if triggers.contains_key(&trigger_key) {
            return Err(SchedulerError::TriggerExists(trigger_key.to_string()));
        }
        let (next_fire_time, cron_expression) = match &spec {
            TriggerSpec::Cron(cron) => (None, Some(cron.expression.clone())),
            TriggerSpec::Once(at) => (Some(*at), None),
        };
        let info = TriggerInfo {
            key: trigger_key.clone(),
            job_key,
            state: TriggerState::Normal,
            next_fire_time,
            previous_fire_time: None,
            cron_expression,
        };
        triggers.insert(trigger_key, FakeTrigger { info, spec, context });
        Ok(())
    }

    async fn pause_job(&self, job_key: &JobKey) -> Result<bool, SchedulerError> {
        if self.fail_pause.lock().contains(job_key) {
            return Err(SchedulerError::Internal(format!("cannot pause {job_key}")));
        }
        let mut found = false;
        for trigger in self.triggers.lock().values_mut() {
            if &trigger.info.job_key == job_key {
                trigger.info.state = TriggerState::Paused;
                found = true;
            }
        }
        Ok(found)
    }

    async fn triggers_of_job(&self, job_key: &JobKey) -> Result<Vec<TriggerInfo>, SchedulerError> {
        Ok(self
            .triggers
            .lock()
            .values()
            .filter(|t| &t.info.job_key == job_key)
            .map(|t| t.info.clone())
            .collect())
    }
}

/// Canned reply of the fake execution service.
#[derive(Debug, Clone)]
pub enum Reply {
    Session(RemoteSession),
    Transport,
    Malformed,
    Unrecognized,
}

impl Reply {
    fn into_result(self) -> Result<RemoteSession, ExecutionError> {
        match self {
            Reply::Session(session) => Ok(session),
            Reply::Transport => Err(ExecutionError::Transport("connection refused".to_string())),
            Reply::Malformed => Err(ExecutionError::MalformedBody("expected value".to_string())),
            Reply::Unrecognized => Err(ExecutionError::UnrecognizedState("zombie".to_string())),
        }
    }
}

pub struct FakeExecutor {
    sessions: Mutex<HashMap<i64, Reply>>,
    submit_reply: Mutex<Reply>,
    submitted: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            submit_reply: Mutex::new(Reply::Session(RemoteSession::default())),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn reply_to_submit(&self, reply: Reply) {
        *self.submit_reply.lock() = reply;
    }

    pub fn reply_for_session(&self, session_id: i64, reply: Reply) {
        self.sessions.lock().insert(session_id, reply);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl ExecutionService for FakeExecutor {
    async fn submit(&self, request: &SubmitRequest) -> Result<RemoteSession, ExecutionError> {
        self.submitted.lock().push(request.name.clone());
        self.submit_reply.lock().clone().into_result()
    }

    async fn session_status(&self, session_id: i64) -> Result<RemoteSession, ExecutionError> {
        self.sessions
            .lock()
            .get(&session_id)
            .cloned()
            .unwrap_or(Reply::Transport)
            .into_result()
    }
}

/// One in-memory store viewed through all three repository traits.
pub struct Stores {
    pub store: Arc<SqliteStore>,
    pub jobs: Arc<dyn JobRepository>,
    pub instances: Arc<dyn InstanceRepository>,
    pub measures: Arc<dyn MeasureCatalog>,
}

pub async fn stores() -> Stores {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    Stores {
        jobs: store.clone(),
        instances: store.clone(),
        measures: store.clone(),
        store,
    }
}

/// Register a measure with connectors `source` and `target`.
pub async fn seed_measure(measures: &Arc<dyn MeasureCatalog>) -> Measure {
    measures
        .register_measure(
            NewMeasure::new("accuracy")
                .with_source("source", vec![DataConnector::new("source", "HIVE")])
                .with_source("target", vec![DataConnector::new("target", "HIVE")]),
        )
        .await
        .unwrap()
}

pub fn past(seconds: i64) -> chrono::DateTime<Utc> {
    Utc::now() - chrono::Duration::seconds(seconds)
}
