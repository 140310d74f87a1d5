//! [`MeasureCatalog`] over SQLite.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use dqjobs_protocols::{Measure, MeasureCatalog, NewMeasure, StoreError, now_millis};

use crate::rows::{MEASURE_COLUMNS, measure_from_row};
use crate::store::{SqliteStore, store_error};

#[cfg(test)]
#[path = "measures_tests.rs"]
mod tests;

#[async_trait]
impl MeasureCatalog for SqliteStore {
    async fn find_active_measure(&self, measure_id: i64) -> Result<Option<Measure>, StoreError> {
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {MEASURE_COLUMNS} FROM measures WHERE id = ?1 AND deleted = 0");
                Ok(conn.query_row(&sql, [measure_id], measure_from_row).optional()?)
            })
            .await
            .map_err(store_error)
    }

    async fn list_active_measures(&self) -> Result<Vec<Measure>, StoreError> {
        self.conn
            .call(|conn| {
                let sql = format!("SELECT {MEASURE_COLUMNS} FROM measures WHERE deleted = 0 ORDER BY id");
                let mut stmt = conn.prepare(&sql)?;
                let measures = stmt
                    .query_map([], measure_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(measures)
            })
            .await
            .map_err(store_error)
    }

    async fn register_measure(&self, measure: NewMeasure) -> Result<Measure, StoreError> {
        let sources = serde_json::to_string(&measure.data_sources)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let created = now_millis();

        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO measures (name, description, data_sources, deleted, created_at)
                     VALUES (?1, ?2, ?3, 0, ?4)",
                    params![measure.name, measure.description, sources, created],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(store_error)?;

        self.find_active_measure(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("measure {id}")))
    }

    async fn retire_measure(&self, measure_id: i64) -> Result<bool, StoreError> {
        self.conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE measures SET deleted = 1 WHERE id = ?1 AND deleted = 0",
                    [measure_id],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(store_error)
    }
}
