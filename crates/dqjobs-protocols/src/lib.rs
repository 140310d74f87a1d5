//! # dqjobs Protocols
//!
//! Data model and collaborator contracts for the dqjobs control plane.
//! Contains only types and interface definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`JobRepository`] - Persistence of jobs and their schedules
//! - [`InstanceRepository`] - Persistence of job instances (one per firing)
//! - [`MeasureCatalog`] - Lookup of measure definitions
//! - [`SchedulerAdapter`] - Trigger/cron engine
//! - [`TriggerHandler`] - Callback invoked when a trigger fires
//! - [`ExecutionService`] - Remote execution (session) service

pub mod error;
pub mod execution;
pub mod instance;
pub mod job;
pub mod measure;
pub mod repository;
pub mod scheduler;

pub use error::{ExecutionError, SchedulerError, StoreError};
pub use execution::{ExecutionService, RemoteSession, SubmitRequest};
pub use instance::{JobInstance, NewJobInstance, PageRequest, SessionState, SessionUpdate};
pub use job::{Job, JobDataSegment, JobSchedule, NewJob, ScheduleRequest, SegmentRange};
pub use measure::{DataConnector, DataSource, Measure, NewMeasure};
pub use repository::{InstanceRepository, JobRepository, MeasureCatalog};
pub use scheduler::{
    CronSpec, FireContext, JobKey, SchedulerAdapter, TriggerHandler, TriggerInfo, TriggerKey,
    TriggerSpec, TriggerState,
};

/// Current wall clock as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
