//! Turns trigger firings into job instances and remote sessions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use dqjobs_protocols::{
    ExecutionService, FireContext, InstanceRepository, JobInstance, JobRepository, MeasureCatalog,
    NewJobInstance, SchedulerAdapter, SessionState, SessionUpdate, SubmitRequest, TriggerHandler,
    TriggerKey, TriggerSpec, now_millis,
};

use crate::error::JobError;

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;

/// Creates an instance when a job's cron trigger fires, then submits it to
/// the execution service when the instance's predicate trigger fires.
pub struct InstanceLauncher {
    jobs: Arc<dyn JobRepository>,
    instances: Arc<dyn InstanceRepository>,
    measures: Arc<dyn MeasureCatalog>,
    scheduler: Arc<dyn SchedulerAdapter>,
    executor: Arc<dyn ExecutionService>,
    predicate_group: String,
    retention: TimeDelta,
}

impl InstanceLauncher {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        instances: Arc<dyn InstanceRepository>,
        measures: Arc<dyn MeasureCatalog>,
        scheduler: Arc<dyn SchedulerAdapter>,
        executor: Arc<dyn ExecutionService>,
        predicate_group: impl Into<String>,
        retention: Duration,
    ) -> Self {
        Self {
            jobs,
            instances,
            measures,
            scheduler,
            executor,
            predicate_group: predicate_group.into(),
            retention: TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX),
        }
    }

    fn expiry_of(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Record a new instance of the job and register its predicate trigger.
    ///
    /// Returns `None` when the job or schedule no longer exists.
    pub async fn create_instance(
        &self,
        job_id: i64,
        schedule_id: i64,
    ) -> Result<Option<JobInstance>, JobError> {
        let Some(job) = self.jobs.find_job(job_id).await? else {
            warn!(job_id, "Trigger fired for a missing or deleted job");
            return Ok(None);
        };
        let Some(schedule) = self.jobs.find_schedule(schedule_id).await? else {
            warn!(job_id, "Schedule {} of job '{}' is gone", schedule_id, job.name);
            return Ok(None);
        };
        debug!(job_id, "Creating instance from schedule {}", schedule.id);

        let now = Utc::now();
        let predicate_key = TriggerKey::new(
            format!("{}_predicate_{}", job.trigger_key.name, now_millis()),
            self.predicate_group.clone(),
        );
        let instance = self
            .instances
            .insert_instance(NewJobInstance {
                job_id: job.id,
                state: SessionState::NotStarted,
                predicate_key: predicate_key.clone(),
                timestamp: now,
                expire_timestamp: self.expiry_of(now),
            })
            .await?;

        let scheduled = self
            .scheduler
            .schedule(
                predicate_key.job_key(),
                predicate_key.clone(),
                TriggerSpec::Once(now),
                FireContext::Predicate {
                    instance_id: instance.id,
                },
            )
            .await;
        if let Err(e) = scheduled {
            error!(instance_id = instance.id, "Failed to register predicate {}: {}", predicate_key, e);
            if let Err(store) = self.instances.mark_instances_deleted(&[instance.id]).await {
                error!(instance_id = instance.id, "Failed to drop orphan instance: {}", store);
            }
            return Err(e.into());
        }

        info!(
            job_id,
            instance_id = instance.id,
            "Created instance with predicate {}", predicate_key
        );
        Ok(Some(instance))
    }

    /// Submit the instance to the execution service and record the session.
    pub async fn submit_instance(&self, instance_id: i64) -> Result<(), JobError> {
        let Some(instance) = self.instances.find_instance(instance_id).await? else {
            warn!(instance_id, "Predicate fired for a missing or deleted instance");
            return Ok(());
        };
        let Some(job) = self.jobs.find_job(instance.job_id).await? else {
            warn!(instance_id, "Job {} of instance is gone", instance.job_id);
            return Ok(());
        };
        let Some(schedule) = self.jobs.find_schedule_of_job(job.id).await? else {
            warn!(instance_id, "Job '{}' has no schedule", job.name);
            return Ok(());
        };
        let Some(measure) = self.measures.find_active_measure(job.measure_id).await? else {
            warn!(instance_id, "Measure {} of job '{}' is retired", job.measure_id, job.name);
            self.instances
                .update_session(instance_id, SessionUpdate::state(SessionState::NotFound))
                .await?;
            return Ok(());
        };

        let request = SubmitRequest {
            name: instance.predicate_key.name.clone(),
            measure,
            schedule,
        };
        let update = match self.executor.submit(&request).await {
            Ok(session) if session.id.is_some() => {
                info!(instance_id, "Submitted as session {:?}", session.id);
                SessionUpdate {
                    session_id: session.id,
                    state: Some(session.state.unwrap_or(SessionState::Starting)),
                    app_id: session.app_id,
                    app_uri: session.app_uri,
                }
            }
            Ok(_) => {
                warn!(instance_id, "Execution service returned no session id");
                SessionUpdate::state(SessionState::Unknown)
            }
            Err(e) => {
                error!(instance_id, "Failed to submit instance: {}", e);
                SessionUpdate::state(SessionState::Unknown)
            }
        };
        self.instances.update_session(instance_id, update).await?;
        Ok(())
    }
}

#[async_trait]
impl TriggerHandler for InstanceLauncher {
    async fn on_fire(&self, context: FireContext) {
        match context {
            FireContext::Schedule { job_id, schedule_id } => {
                if let Err(e) = self.create_instance(job_id, schedule_id).await {
                    error!(job_id, "Failed to create job instance: {}", e);
                }
            }
            FireContext::Predicate { instance_id } => {
                if let Err(e) = self.submit_instance(instance_id).await {
                    error!(instance_id, "Failed to submit job instance: {}", e);
                }
            }
        }
    }
}
