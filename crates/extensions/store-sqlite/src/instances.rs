//! [`InstanceRepository`] over SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};

use dqjobs_protocols::{
    InstanceRepository, JobInstance, NewJobInstance, PageRequest, SessionState, SessionUpdate,
    StoreError,
};

use crate::rows::{INSTANCE_COLUMNS, instance_from_row};
use crate::store::{SqliteStore, store_error};

#[cfg(test)]
#[path = "instances_tests.rs"]
mod tests;

impl SqliteStore {
    async fn query_instances(&self, sql: String, args: Vec<Value>) -> Result<Vec<JobInstance>, StoreError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let instances = stmt
                    .query_map(params_from_iter(args), instance_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(instances)
            })
            .await
            .map_err(store_error)
    }
}

fn active_state_list() -> String {
    SessionState::ACTIVE
        .iter()
        .map(|state| format!("'{}'", state.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl InstanceRepository for SqliteStore {
    async fn insert_instance(&self, instance: NewJobInstance) -> Result<JobInstance, StoreError> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO job_instances
                       (job_id, state, predicate_name, predicate_group, timestamp, expire_timestamp, deleted)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                    params![
                        instance.job_id,
                        instance.state.as_str(),
                        instance.predicate_key.name,
                        instance.predicate_key.group,
                        instance.timestamp.timestamp_millis(),
                        instance.expire_timestamp.timestamp_millis()
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(store_error)?;

        self.find_instance(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("instance {id}")))
    }

    async fn find_instance(&self, instance_id: i64) -> Result<Option<JobInstance>, StoreError> {
        self.conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {INSTANCE_COLUMNS} FROM job_instances WHERE id = ?1 AND deleted = 0"
                );
                Ok(conn.query_row(&sql, [instance_id], instance_from_row).optional()?)
            })
            .await
            .map_err(store_error)
    }

    async fn find_instances_of_job(&self, job_id: i64) -> Result<Vec<JobInstance>, StoreError> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM job_instances
             WHERE job_id = ?1 AND deleted = 0 ORDER BY timestamp DESC, id DESC"
        );
        self.query_instances(sql, vec![Value::Integer(job_id)]).await
    }

    async fn find_instances_by_job_name(
        &self,
        group: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<JobInstance>, StoreError> {
        let columns = INSTANCE_COLUMNS
            .split(", ")
            .map(|c| format!("i.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM job_instances i JOIN jobs j ON i.job_id = j.id
             WHERE j.name = ?1 AND j.trigger_group = ?2 AND j.deleted = 0 AND i.deleted = 0
             ORDER BY i.timestamp DESC, i.id DESC
             LIMIT ?3 OFFSET ?4"
        );
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        self.query_instances(
            sql,
            vec![
                Value::Text(name.to_string()),
                Value::Text(group.to_string()),
                Value::Integer(i64::from(page.size)),
                Value::Integer(offset),
            ],
        )
        .await
    }

    async fn latest_instance_of_job(&self, job_id: i64) -> Result<Option<JobInstance>, StoreError> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM job_instances
             WHERE job_id = ?1 AND deleted = 0 ORDER BY timestamp DESC, id DESC LIMIT 1"
        );
        Ok(self
            .query_instances(sql, vec![Value::Integer(job_id)])
            .await?
            .into_iter()
            .next())
    }

    async fn find_active_instances(&self) -> Result<Vec<JobInstance>, StoreError> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM job_instances
             WHERE deleted = 0 AND state IN ({}) ORDER BY id",
            active_state_list()
        );
        self.query_instances(sql, Vec::new()).await
    }

    async fn find_expired_instances(&self, now: DateTime<Utc>) -> Result<Vec<JobInstance>, StoreError> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM job_instances
             WHERE deleted = 0 AND expire_timestamp <= ?1 ORDER BY id"
        );
        self.query_instances(sql, vec![Value::Integer(now.timestamp_millis())])
            .await
    }

    async fn update_session(&self, instance_id: i64, update: SessionUpdate) -> Result<(), StoreError> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE job_instances SET
                       session_id = COALESCE(?1, session_id),
                       state = COALESCE(?2, state),
                       app_id = COALESCE(?3, app_id),
                       app_uri = COALESCE(?4, app_uri)
                     WHERE id = ?5",
                    params![
                        update.session_id,
                        update.state.map(|s| s.as_str()),
                        update.app_id,
                        update.app_uri,
                        instance_id
                    ],
                )?;
                Ok(changed)
            })
            .await
            .map_err(store_error)?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("instance {instance_id}")));
        }
        Ok(())
    }

    async fn mark_instances_deleted(&self, instance_ids: &[i64]) -> Result<usize, StoreError> {
        let ids = instance_ids.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut changed = 0;
                {
                    let mut stmt =
                        tx.prepare("UPDATE job_instances SET deleted = 1 WHERE id = ?1 AND deleted = 0")?;
                    for id in ids {
                        changed += stmt.execute([id])?;
                    }
                }
                tx.commit()?;
                Ok(changed)
            })
            .await
            .map_err(store_error)
    }

    async fn purge_expired_instances(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let now = now.timestamp_millis();
        self.conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM job_instances WHERE expire_timestamp <= ?1 AND deleted = 1",
                    [now],
                )?)
            })
            .await
            .map_err(store_error)
    }
}
