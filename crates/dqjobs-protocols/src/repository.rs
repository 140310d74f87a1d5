//! Persistence contracts.
//!
//! Soft-deleted rows are invisible to every query unless the method name
//! says `including_deleted`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::instance::{JobInstance, NewJobInstance, PageRequest, SessionUpdate};
use crate::job::{Job, JobSchedule, NewJob, ScheduleRequest};
use crate::measure::{Measure, NewMeasure};

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Persist a job and its schedule atomically.
    ///
    /// Fails with [`StoreError::Conflict`] when a non-deleted job already
    /// uses the name.
    async fn create_job(
        &self,
        job: NewJob,
        schedule: &ScheduleRequest,
    ) -> Result<(Job, JobSchedule), StoreError>;

    /// Hard-delete a job and its schedule. Only used to undo a creation
    /// whose trigger registration failed.
    async fn discard_job(&self, job_id: i64) -> Result<(), StoreError>;

    async fn find_job(&self, job_id: i64) -> Result<Option<Job>, StoreError>;

    async fn find_job_including_deleted(&self, job_id: i64) -> Result<Option<Job>, StoreError>;

    async fn find_jobs(&self) -> Result<Vec<Job>, StoreError>;

    async fn find_jobs_by_name(&self, name: &str) -> Result<Vec<Job>, StoreError>;

    async fn find_jobs_by_measure(&self, measure_id: i64) -> Result<Vec<Job>, StoreError>;

    async fn count_jobs_by_name(&self, name: &str) -> Result<u64, StoreError>;

    async fn find_schedule(&self, schedule_id: i64) -> Result<Option<JobSchedule>, StoreError>;

    async fn find_schedule_of_job(&self, job_id: i64) -> Result<Option<JobSchedule>, StoreError>;

    /// Returns `false` when the job was absent or already deleted.
    async fn mark_job_deleted(&self, job_id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait InstanceRepository: Send + Sync {
    async fn insert_instance(&self, instance: NewJobInstance) -> Result<JobInstance, StoreError>;

    async fn find_instance(&self, instance_id: i64) -> Result<Option<JobInstance>, StoreError>;

    async fn find_instances_of_job(&self, job_id: i64) -> Result<Vec<JobInstance>, StoreError>;

    /// Instances of the non-deleted job named `name` whose trigger lives in
    /// `group`, newest first.
    async fn find_instances_by_job_name(
        &self,
        group: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<JobInstance>, StoreError>;

    async fn latest_instance_of_job(&self, job_id: i64) -> Result<Option<JobInstance>, StoreError>;

    /// Instances in a non-terminal session state.
    async fn find_active_instances(&self) -> Result<Vec<JobInstance>, StoreError>;

    async fn find_expired_instances(&self, now: DateTime<Utc>) -> Result<Vec<JobInstance>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when the instance row is gone.
    async fn update_session(&self, instance_id: i64, update: SessionUpdate) -> Result<(), StoreError>;

    async fn mark_instances_deleted(&self, instance_ids: &[i64]) -> Result<usize, StoreError>;

    /// Physically remove rows that are both expired and already marked
    /// deleted.
    async fn purge_expired_instances(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait MeasureCatalog: Send + Sync {
    async fn find_active_measure(&self, measure_id: i64) -> Result<Option<Measure>, StoreError>;

    async fn list_active_measures(&self) -> Result<Vec<Measure>, StoreError>;

    async fn register_measure(&self, measure: NewMeasure) -> Result<Measure, StoreError>;

    /// Returns `false` when the measure was absent or already retired.
    async fn retire_measure(&self, measure_id: i64) -> Result<bool, StoreError>;
}
