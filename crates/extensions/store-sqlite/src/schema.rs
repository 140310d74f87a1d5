//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS measures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    data_sources TEXT NOT NULL DEFAULT '[]',
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    measure_id INTEGER NOT NULL,
    trigger_name TEXT NOT NULL,
    trigger_group TEXT NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

-- At most one live job per name; deleted jobs keep their name.
CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_live_name ON jobs(name) WHERE deleted = 0;
CREATE INDEX IF NOT EXISTS idx_jobs_measure ON jobs(measure_id);

CREATE TABLE IF NOT EXISTS job_schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL UNIQUE,
    job_name TEXT NOT NULL,
    measure_id INTEGER NOT NULL,
    cron_expression TEXT NOT NULL,
    time_zone TEXT NOT NULL,
    segments TEXT NOT NULL DEFAULT '[]',
    FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS job_instances (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL,
    session_id INTEGER,
    state TEXT NOT NULL,
    app_id TEXT,
    app_uri TEXT,
    predicate_name TEXT NOT NULL,
    predicate_group TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    expire_timestamp INTEGER NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_instances_job ON job_instances(job_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_instances_expire ON job_instances(expire_timestamp);
CREATE INDEX IF NOT EXISTS idx_instances_state ON job_instances(state);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        for table in ["measures", "jobs", "job_schedules", "job_instances"] {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")
                .unwrap();
            assert!(stmt.exists([table]).unwrap(), "missing table {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn test_live_name_index_allows_deleted_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let insert = "INSERT INTO jobs (name, measure_id, trigger_name, trigger_group, deleted, created_at)
                      VALUES ('daily', 1, ?1, 'BA', ?2, 0)";
        conn.execute(insert, rusqlite::params!["daily_1", 1]).unwrap();
        conn.execute(insert, rusqlite::params!["daily_2", 0]).unwrap();
        assert!(conn.execute(insert, rusqlite::params!["daily_3", 0]).is_err());
    }
}
