//! SQLite store handle.

use std::path::Path;

use rusqlite::ErrorCode;
use tokio_rusqlite::Connection;
use tracing::info;

use dqjobs_protocols::StoreError;

use crate::schema::init_schema;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// SQLite-backed store for jobs, schedules, instances and measures.
pub struct SqliteStore {
    pub(crate) conn: Connection,
}

impl SqliteStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Self::init(conn).await
    }

    /// Open (or create) a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        }
        info!("Opening job store at {}", path.display());
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(store_error)?;
        Ok(Self { conn })
    }
}

/// Classify a connection-call failure.
pub(crate) fn store_error(err: tokio_rusqlite::Error) -> StoreError {
    match err {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, message))
            if code.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(message.unwrap_or_else(|| code.to_string()))
        }
        tokio_rusqlite::Error::Rusqlite(e @ rusqlite::Error::FromSqlConversionFailure(..)) => {
            StoreError::SerializationError(e.to_string())
        }
        tokio_rusqlite::Error::ConnectionClosed => {
            StoreError::ConnectionError("connection closed".to_string())
        }
        other => StoreError::QueryError(other.to_string()),
    }
}
