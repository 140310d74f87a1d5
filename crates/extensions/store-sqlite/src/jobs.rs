//! [`JobRepository`] over SQLite.

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::debug;

use dqjobs_protocols::{
    Job, JobRepository, JobSchedule, NewJob, ScheduleRequest, StoreError, now_millis,
};

use crate::rows::{JOB_COLUMNS, SCHEDULE_COLUMNS, job_from_row, schedule_from_row};
use crate::store::{SqliteStore, store_error};

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;

impl SqliteStore {
    async fn query_jobs(&self, filter: &'static str, args: Vec<Value>) -> Result<Vec<Job>, StoreError> {
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE deleted = 0 {filter} ORDER BY id");
                let mut stmt = conn.prepare(&sql)?;
                let jobs = stmt
                    .query_map(params_from_iter(args), job_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(jobs)
            })
            .await
            .map_err(store_error)
    }

    async fn query_schedule(&self, column: &'static str, id: i64) -> Result<Option<JobSchedule>, StoreError> {
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM job_schedules WHERE {column} = ?1");
                Ok(conn.query_row(&sql, [id], schedule_from_row).optional()?)
            })
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl JobRepository for SqliteStore {
    async fn create_job(
        &self,
        job: NewJob,
        schedule: &ScheduleRequest,
    ) -> Result<(Job, JobSchedule), StoreError> {
        let segments_json = serde_json::to_string(&schedule.segments)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let schedule = schedule.clone();
        let created = now_millis();

        let (job_id, schedule_id) = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                tx.execute(
                    "INSERT INTO jobs (name, measure_id, trigger_name, trigger_group, deleted, created_at)
                     VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                    params![job.name, job.measure_id, job.trigger_key.name, job.trigger_key.group, created],
                )?;
                let job_id = tx.last_insert_rowid();

                tx.execute(
                    "INSERT INTO job_schedules (job_id, job_name, measure_id, cron_expression, time_zone, segments)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        job_id,
                        job.name,
                        schedule.measure_id,
                        schedule.cron_expression,
                        schedule.time_zone,
                        segments_json
                    ],
                )?;
                let schedule_id = tx.last_insert_rowid();

                tx.commit()?;
                Ok((job_id, schedule_id))
            })
            .await
            .map_err(store_error)?;

        debug!(job_id, schedule_id, "Persisted job and schedule");

        let job = self
            .find_job(job_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))?;
        let schedule = self
            .find_schedule(schedule_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("schedule {schedule_id}")))?;
        Ok((job, schedule))
    }

    async fn discard_job(&self, job_id: i64) -> Result<(), StoreError> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM job_schedules WHERE job_id = ?1", [job_id])?;
                tx.execute("DELETE FROM jobs WHERE id = ?1", [job_id])?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(store_error)
    }

    async fn find_job(&self, job_id: i64) -> Result<Option<Job>, StoreError> {
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1 AND deleted = 0");
                Ok(conn.query_row(&sql, [job_id], job_from_row).optional()?)
            })
            .await
            .map_err(store_error)
    }

    async fn find_job_including_deleted(&self, job_id: i64) -> Result<Option<Job>, StoreError> {
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
                Ok(conn.query_row(&sql, [job_id], job_from_row).optional()?)
            })
            .await
            .map_err(store_error)
    }

    async fn find_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.query_jobs("", Vec::new()).await
    }

    async fn find_jobs_by_name(&self, name: &str) -> Result<Vec<Job>, StoreError> {
        self.query_jobs("AND name = ?1", vec![Value::Text(name.to_string())])
            .await
    }

    async fn find_jobs_by_measure(&self, measure_id: i64) -> Result<Vec<Job>, StoreError> {
        self.query_jobs("AND measure_id = ?1", vec![Value::Integer(measure_id)])
            .await
    }

    async fn count_jobs_by_name(&self, name: &str) -> Result<u64, StoreError> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM jobs WHERE name = ?1 AND deleted = 0",
                    [name],
                    |row| row.get(0),
                )?;
                Ok(count.max(0) as u64)
            })
            .await
            .map_err(store_error)
    }

    async fn find_schedule(&self, schedule_id: i64) -> Result<Option<JobSchedule>, StoreError> {
        self.query_schedule("id", schedule_id).await
    }

    async fn find_schedule_of_job(&self, job_id: i64) -> Result<Option<JobSchedule>, StoreError> {
        self.query_schedule("job_id", job_id).await
    }

    async fn mark_job_deleted(&self, job_id: i64) -> Result<bool, StoreError> {
        self.conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE jobs SET deleted = 1 WHERE id = ?1 AND deleted = 0",
                    [job_id],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(store_error)
    }
}
