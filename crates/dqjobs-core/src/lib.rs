//! # dqjobs Core
//!
//! Job lifecycle and instance reconciliation.
//!
//! ## Components
//!
//! - [`JobLifecycleManager`] - Creation, validation, deletion, expiry and health of jobs
//! - [`InstanceLauncher`] - Turns trigger firings into tracked job instances
//! - [`ExecutionStatusPoller`] - Reconciles instance state with the execution service
//! - [`BackgroundSweeps`] - Fixed-delay loops driving expiry and polling

pub mod error;
pub mod launcher;
pub mod lifecycle;
pub mod poller;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

pub use error::JobError;
pub use launcher::InstanceLauncher;
pub use lifecycle::{
    AliveJob, DEFAULT_PAGE_SIZE, HealthInfo, JobLifecycleManager, MAX_PAGE_SIZE, page_request,
};
pub use poller::{ExecutionStatusPoller, SyncReport};
pub use sweeper::BackgroundSweeps;
