//! Job lifecycle errors.

use thiserror::Error;

use dqjobs_protocols::{ExecutionError, SchedulerError, StoreError};

#[derive(Debug, Error)]
pub enum JobError {
    /// Bad input; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ExecutionError> for JobError {
    fn from(err: ExecutionError) -> Self {
        if err.is_transport() {
            JobError::RemoteService(err.to_string())
        } else {
            JobError::DataFormat(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = JobError::Validation("exactly one baseline segment is required".to_string());
        assert!(err.to_string().contains("Validation failed"));
        assert!(err.to_string().contains("baseline"));
    }

    #[test]
    fn test_from_scheduler_error() {
        let err: JobError = SchedulerError::TriggerExists("BA.daily_1".to_string()).into();
        assert!(matches!(err, JobError::Scheduler(_)));
        assert!(err.to_string().contains("BA.daily_1"));
    }

    #[test]
    fn test_from_store_error() {
        let err: JobError = StoreError::QueryError("disk I/O error".to_string()).into();
        assert!(matches!(err, JobError::Store(_)));
    }

    #[test]
    fn test_from_execution_error() {
        let transport: JobError = ExecutionError::Transport("timed out".to_string()).into();
        assert!(matches!(transport, JobError::RemoteService(_)));

        let malformed: JobError = ExecutionError::MalformedBody("eof".to_string()).into();
        assert!(matches!(malformed, JobError::DataFormat(_)));

        let state: JobError = ExecutionError::UnrecognizedState("wrong".to_string()).into();
        assert!(matches!(state, JobError::DataFormat(_)));
    }
}
