//! Job lifecycle manager.
//!
//! Owns the pairing between persisted jobs and their scheduler triggers:
//! a job row never outlives a failed trigger registration, and deletion only
//! pauses triggers and flags rows.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use dqjobs_protocols::{
    CronSpec, FireContext, InstanceRepository, Job, JobInstance, JobRepository, JobSchedule,
    Measure, MeasureCatalog, NewJob, NewMeasure, PageRequest, ScheduleRequest, SchedulerAdapter,
    SchedulerError, StoreError, TriggerKey, TriggerSpec, now_millis,
};

use crate::error::JobError;

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 1024;

/// Normalize client paging input.
///
/// A negative page becomes 0; a non-positive size becomes
/// [`DEFAULT_PAGE_SIZE`]; sizes above [`MAX_PAGE_SIZE`] are clamped.
pub fn page_request(page: i64, size: i64) -> PageRequest {
    let page = u32::try_from(page.max(0)).unwrap_or(u32::MAX);
    let size = if size <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        u32::try_from(size.min(i64::from(MAX_PAGE_SIZE))).unwrap_or(MAX_PAGE_SIZE)
    };
    PageRequest::new(page, size)
}

/// Summary of a job that has at least one registered trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliveJob {
    pub job_id: i64,
    pub job_name: String,
    pub measure_id: i64,
    pub group_name: String,
    pub trigger_state: String,
    /// Epoch millis, `-1` when unknown.
    pub next_fire_time: i64,
    /// Epoch millis, `-1` when the trigger never fired.
    pub previous_fire_time: i64,
    pub cron_expression: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInfo {
    pub job_count: u64,
    pub healthy_job_count: u64,
}

/// Orchestrates job creation, deletion, instance expiry and health.
pub struct JobLifecycleManager {
    jobs: Arc<dyn JobRepository>,
    instances: Arc<dyn InstanceRepository>,
    measures: Arc<dyn MeasureCatalog>,
    scheduler: Arc<dyn SchedulerAdapter>,
    group: String,
}

impl JobLifecycleManager {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        instances: Arc<dyn InstanceRepository>,
        measures: Arc<dyn MeasureCatalog>,
        scheduler: Arc<dyn SchedulerAdapter>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            jobs,
            instances,
            measures,
            scheduler,
            group: group.into(),
        }
    }

    /// Scheduler group of primary job triggers.
    pub fn group(&self) -> &str {
        &self.group
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Validate the request, persist the job and register its cron trigger.
    ///
    /// Either both the rows and the trigger exist afterwards, or neither does.
    pub async fn add_job(&self, request: ScheduleRequest) -> Result<Job, JobError> {
        let measure = self
            .measures
            .find_active_measure(request.measure_id)
            .await?
            .ok_or_else(|| JobError::NotFound(format!("measure {}", request.measure_id)))?;

        self.validate_job_name(&request.job_name).await?;
        validate_baseline(&request)?;
        validate_connectors(&request, &measure)?;

        let trigger_key = TriggerKey::new(
            format!("{}_{}", request.job_name, now_millis()),
            self.group.clone(),
        );
        if self.scheduler.check_exists(&trigger_key).await? {
            return Err(SchedulerError::TriggerExists(trigger_key.to_string()).into());
        }

        let new_job = NewJob {
            name: request.job_name.clone(),
            measure_id: measure.id,
            trigger_key,
        };
        let (job, schedule) = self
            .jobs
            .create_job(new_job, &request)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    JobError::Validation(format!("job name '{}' is already used", request.job_name))
                }
                other => other.into(),
            })?;

        if let Err(e) = self.register_schedule(&job, &schedule).await {
            error!(job_id = job.id, "Failed to register trigger {}: {}", job.trigger_key, e);
            if let Err(discard) = self.jobs.discard_job(job.id).await {
                error!(job_id = job.id, "Failed to roll back job rows: {}", discard);
            }
            return Err(e.into());
        }

        info!(
            job_id = job.id,
            "Created job '{}' with trigger {}", job.name, job.trigger_key
        );
        Ok(job)
    }

    async fn validate_job_name(&self, name: &str) -> Result<(), JobError> {
        if name.trim().is_empty() {
            return Err(JobError::Validation("job name cannot be empty".to_string()));
        }
        if self.jobs.count_jobs_by_name(name).await? > 0 {
            return Err(JobError::Validation(format!("job name '{name}' is already used")));
        }
        Ok(())
    }

    async fn register_schedule(&self, job: &Job, schedule: &JobSchedule) -> Result<(), SchedulerError> {
        self.scheduler
            .schedule(
                job.trigger_key.job_key(),
                job.trigger_key.clone(),
                TriggerSpec::Cron(CronSpec::new(
                    schedule.cron_expression.clone(),
                    schedule.time_zone.clone(),
                )),
                FireContext::Schedule {
                    job_id: job.id,
                    schedule_id: schedule.id,
                },
            )
            .await
    }

    /// Re-register primary triggers missing from the scheduler.
    ///
    /// Returns the number of restored triggers; per-job failures are logged.
    pub async fn restore_triggers(&self) -> Result<usize, JobError> {
        let mut restored = 0;
        for job in self.jobs.find_jobs().await? {
            if self.scheduler.check_exists(&job.trigger_key).await? {
                continue;
            }
            let Some(schedule) = self.jobs.find_schedule_of_job(job.id).await? else {
                warn!(job_id = job.id, "Job '{}' has no schedule, not restoring", job.name);
                continue;
            };
            match self.register_schedule(&job, &schedule).await {
                Ok(()) => restored += 1,
                Err(e) => warn!(job_id = job.id, "Failed to restore trigger {}: {}", job.trigger_key, e),
            }
        }
        if restored > 0 {
            info!("Restored {} job triggers", restored);
        }
        Ok(restored)
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    pub async fn delete_job_by_id(&self, job_id: i64) -> Result<(), JobError> {
        let job = self
            .jobs
            .find_job(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(format!("job {job_id}")))?;
        self.delete_job(&job).await
    }

    /// Delete every live job with this name, stopping at the first failure.
    pub async fn delete_job_by_name(&self, name: &str) -> Result<(), JobError> {
        let jobs = self.jobs.find_jobs_by_name(name).await?;
        if jobs.is_empty() {
            warn!("There is no job named '{}'", name);
            return Err(JobError::NotFound(format!("job '{name}'")));
        }
        for job in &jobs {
            self.delete_job(job).await?;
        }
        Ok(())
    }

    /// Delete every live job of the measure. Returns `false` when there was
    /// none; individual failures are logged and skipped.
    pub async fn delete_jobs_related_to_measure(&self, measure_id: i64) -> Result<bool, JobError> {
        let jobs = self.jobs.find_jobs_by_measure(measure_id).await?;
        if jobs.is_empty() {
            warn!("Measure {} has no related jobs", measure_id);
            return Ok(false);
        }
        for job in &jobs {
            if let Err(e) = self.delete_job(job).await {
                error!(job_id = job.id, "Failed to delete job of measure {}: {}", measure_id, e);
            }
        }
        Ok(true)
    }

    async fn delete_job(&self, job: &Job) -> Result<(), JobError> {
        let job_key = job.trigger_key.job_key();
        if !self.scheduler.pause_job(&job_key).await? {
            warn!(job_id = job.id, "Job {} has no registered trigger", job_key);
        }

        let instances = self.instances.find_instances_of_job(job.id).await?;
        self.pause_and_flag(&instances).await?;

        self.jobs.mark_job_deleted(job.id).await?;
        info!(job_id = job.id, "Deleted job '{}'", job.name);
        Ok(())
    }

    /// Pause the predicate trigger of each instance and mark the paused ones
    /// deleted. Fails when any pause failed; those instances stay live.
    async fn pause_and_flag(&self, instances: &[JobInstance]) -> Result<(), JobError> {
        let mut paused = Vec::with_capacity(instances.len());
        let mut failed = 0usize;
        for instance in instances {
            let job_key = instance.predicate_key.job_key();
            match self.scheduler.pause_job(&job_key).await {
                Ok(found) => {
                    if !found {
                        debug!(instance_id = instance.id, "Predicate job {} already gone", job_key);
                    }
                    paused.push(instance.id);
                }
                Err(e) => {
                    error!(
                        instance_id = instance.id,
                        "Failed to pause predicate job {}: {}", job_key, e
                    );
                    failed += 1;
                }
            }
        }

        if !paused.is_empty() {
            self.instances.mark_instances_deleted(&paused).await?;
        }
        if failed > 0 {
            return Err(SchedulerError::Internal(format!(
                "failed to pause {failed} predicate job(s)"
            ))
            .into());
        }
        Ok(())
    }

    /// Reclaim expired instances.
    ///
    /// Only rows whose predicate trigger was paused are purged; any pause
    /// failure aborts the sweep before the purge.
    pub async fn delete_expired_job_instances(&self) -> Result<usize, JobError> {
        let now = Utc::now();
        let expired = self.instances.find_expired_instances(now).await?;
        if let Err(e) = self.pause_and_flag(&expired).await {
            error!("Expired instance sweep aborted before purge: {}", e);
            return Err(e);
        }

        let purged = self.instances.purge_expired_instances(now).await?;
        if purged > 0 {
            info!("Purged {} expired job instances", purged);
        }
        Ok(purged)
    }

    // ------------------------------------------------------------------
    // Measures
    // ------------------------------------------------------------------

    pub async fn register_measure(&self, measure: NewMeasure) -> Result<Measure, JobError> {
        if measure.name.trim().is_empty() {
            return Err(JobError::Validation("measure name cannot be empty".to_string()));
        }
        let mut seen = HashSet::new();
        for connector in measure.data_sources.iter().flat_map(|s| &s.connectors) {
            if !seen.insert(connector.name.as_str()) {
                return Err(JobError::Validation(format!(
                    "duplicate connector name '{}'",
                    connector.name
                )));
            }
        }
        let measure = self.measures.register_measure(measure).await?;
        info!("Registered measure {} '{}'", measure.id, measure.name);
        Ok(measure)
    }

    pub async fn list_measures(&self) -> Result<Vec<Measure>, JobError> {
        Ok(self.measures.list_active_measures().await?)
    }

    /// Delete the measure's jobs, then retire the measure itself.
    pub async fn retire_measure(&self, measure_id: i64) -> Result<(), JobError> {
        if self.measures.find_active_measure(measure_id).await?.is_none() {
            return Err(JobError::NotFound(format!("measure {measure_id}")));
        }
        self.delete_jobs_related_to_measure(measure_id).await?;
        self.measures.retire_measure(measure_id).await?;
        info!("Retired measure {}", measure_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn find_instances_of_job(
        &self,
        group: &str,
        job_name: &str,
        page: i64,
        size: i64,
    ) -> Result<Vec<JobInstance>, JobError> {
        let page = page_request(page, size);
        let instances = self
            .instances
            .find_instances_by_job_name(group, job_name, page)
            .await?;
        if instances.is_empty() {
            debug!("No instances of job '{}' in group {}", job_name, group);
        }
        Ok(instances)
    }

    /// Jobs with at least one registered trigger.
    pub async fn alive_jobs(&self) -> Result<Vec<AliveJob>, JobError> {
        let mut alive = Vec::new();
        for job in self.jobs.find_jobs().await? {
            let triggers = self
                .scheduler
                .triggers_of_job(&job.trigger_key.job_key())
                .await?;
            let Some(first) = triggers.first() else {
                debug!(job_id = job.id, "Job '{}' has no triggers, omitted", job.name);
                continue;
            };

            alive.push(AliveJob {
                job_id: job.id,
                job_name: job.name.clone(),
                measure_id: job.measure_id,
                group_name: job.trigger_key.group.clone(),
                trigger_state: first.state.to_string(),
                next_fire_time: first.next_fire_time.map_or(-1, |t| t.timestamp_millis()),
                previous_fire_time: first.previous_fire_time.map_or(-1, |t| t.timestamp_millis()),
                cron_expression: triggers.iter().find_map(|t| t.cron_expression.clone()),
            });
        }
        Ok(alive)
    }

    pub async fn health_info(&self) -> Result<HealthInfo, JobError> {
        let mut health = HealthInfo::default();
        for job in self.jobs.find_jobs().await? {
            let triggers = self
                .scheduler
                .triggers_of_job(&job.trigger_key.job_key())
                .await?;
            if triggers.is_empty() {
                continue;
            }
            health.job_count += 1;

            let latest = self.instances.latest_instance_of_job(job.id).await?;
            if latest.is_some_and(|instance| instance.state.is_healthy()) {
                health.healthy_job_count += 1;
            }
        }
        Ok(health)
    }
}

fn validate_baseline(request: &ScheduleRequest) -> Result<(), JobError> {
    match request.baseline_count() {
        1 => Ok(()),
        n => Err(JobError::Validation(format!(
            "exactly one baseline segment is required, found {n}"
        ))),
    }
}

fn validate_connectors(request: &ScheduleRequest, measure: &Measure) -> Result<(), JobError> {
    let names: HashSet<&str> = measure.connector_names().into_iter().collect();
    match request
        .segments
        .iter()
        .find(|segment| !names.contains(segment.data_connector_name.as_str()))
    {
        Some(segment) => Err(JobError::Validation(format!(
            "connector '{}' is not part of measure {}",
            segment.data_connector_name, measure.id
        ))),
        None => Ok(()),
    }
}
