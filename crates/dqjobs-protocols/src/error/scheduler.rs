//! Trigger engine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Trigger already exists: {0}")]
    TriggerExists(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Unsupported time zone: {0}")]
    InvalidTimeZone(String),

    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),

    #[error("Scheduler error: {0}")]
    Internal(String),
}
