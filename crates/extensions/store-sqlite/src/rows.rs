//! Row mapping between SQLite and the protocol types.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use dqjobs_protocols::{
    DataSource, Job, JobDataSegment, JobInstance, JobSchedule, Measure, SessionState, TriggerKey,
};

pub(crate) const JOB_COLUMNS: &str =
    "id, name, measure_id, trigger_name, trigger_group, deleted, created_at";

pub(crate) const SCHEDULE_COLUMNS: &str =
    "id, job_id, job_name, measure_id, cron_expression, time_zone, segments";

pub(crate) const INSTANCE_COLUMNS: &str = "id, job_id, session_id, state, app_id, app_uri, \
     predicate_name, predicate_group, timestamp, expire_timestamp, deleted";

pub(crate) const MEASURE_COLUMNS: &str = "id, name, description, data_sources, deleted";

pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

pub(crate) fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        name: row.get(1)?,
        measure_id: row.get(2)?,
        trigger_key: TriggerKey::new(row.get::<_, String>(3)?, row.get::<_, String>(4)?),
        deleted: row.get(5)?,
        created_at: from_millis(row.get(6)?),
    })
}

pub(crate) fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<JobSchedule> {
    let segments: Vec<JobDataSegment> = json_column(row, 6)?;
    Ok(JobSchedule {
        id: row.get(0)?,
        job_id: row.get(1)?,
        job_name: row.get(2)?,
        measure_id: row.get(3)?,
        cron_expression: row.get(4)?,
        time_zone: row.get(5)?,
        segments,
    })
}

pub(crate) fn instance_from_row(row: &Row<'_>) -> rusqlite::Result<JobInstance> {
    let raw_state: String = row.get(3)?;
    let state: SessionState = raw_state
        .parse()
        .map_err(|s| conversion_error(3, format!("unknown session state '{s}'")))?;
    Ok(JobInstance {
        id: row.get(0)?,
        job_id: row.get(1)?,
        session_id: row.get(2)?,
        state,
        app_id: row.get(4)?,
        app_uri: row.get(5)?,
        predicate_key: TriggerKey::new(row.get::<_, String>(6)?, row.get::<_, String>(7)?),
        timestamp: from_millis(row.get(8)?),
        expire_timestamp: from_millis(row.get(9)?),
        deleted: row.get(10)?,
    })
}

pub(crate) fn measure_from_row(row: &Row<'_>) -> rusqlite::Result<Measure> {
    let data_sources: Vec<DataSource> = json_column(row, 3)?;
    Ok(Measure {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        data_sources,
        deleted: row.get(4)?,
    })
}
