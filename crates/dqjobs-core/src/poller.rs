//! Reconciles instance state with the execution service.

use std::sync::Arc;

use tracing::{debug, info, warn};

use dqjobs_protocols::{ExecutionService, InstanceRepository, JobInstance, SessionState, SessionUpdate};

use crate::error::JobError;

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;

/// Outcome counts of one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated: usize,
    pub marked_unknown: usize,
    pub skipped: usize,
}

enum Outcome {
    Updated,
    MarkedUnknown,
    Skipped,
}

pub struct ExecutionStatusPoller {
    instances: Arc<dyn InstanceRepository>,
    executor: Arc<dyn ExecutionService>,
}

impl ExecutionStatusPoller {
    pub fn new(instances: Arc<dyn InstanceRepository>, executor: Arc<dyn ExecutionService>) -> Self {
        Self { instances, executor }
    }

    /// Refresh every active instance. A failure on one instance never stops
    /// the pass.
    pub async fn sync_instances_of_all_jobs(&self) -> Result<SyncReport, JobError> {
        let instances = self.instances.find_active_instances().await?;
        let mut report = SyncReport::default();
        for instance in &instances {
            match self.sync_instance(instance).await {
                Ok(Outcome::Updated) => report.updated += 1,
                Ok(Outcome::MarkedUnknown) => report.marked_unknown += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(instance_id = instance.id, "Failed to store session state: {}", e);
                    report.skipped += 1;
                }
            }
        }
        if !instances.is_empty() {
            info!(
                "Synced {} instances: {} updated, {} unknown, {} skipped",
                instances.len(),
                report.updated,
                report.marked_unknown,
                report.skipped
            );
        }
        Ok(report)
    }

    async fn sync_instance(&self, instance: &JobInstance) -> Result<Outcome, JobError> {
        let Some(session_id) = instance.session_id else {
            debug!(instance_id = instance.id, "Instance has no session yet");
            return Ok(Outcome::Skipped);
        };

        match self.executor.session_status(session_id).await {
            Ok(session) => {
                let Some(state) = session.state else {
                    debug!(instance_id = instance.id, "Session {} reported no state", session_id);
                    return Ok(Outcome::Skipped);
                };
                let update = SessionUpdate {
                    session_id: None,
                    state: Some(state),
                    app_id: session.app_id,
                    app_uri: session.app_uri,
                };
                self.instances.update_session(instance.id, update).await?;
                Ok(Outcome::Updated)
            }
            Err(e) if e.is_transport() => {
                warn!(instance_id = instance.id, "Session {} unreachable: {}", session_id, e);
                self.instances
                    .update_session(instance.id, SessionUpdate::state(SessionState::Unknown))
                    .await?;
                Ok(Outcome::MarkedUnknown)
            }
            Err(e) => {
                warn!(instance_id = instance.id, "Ignoring response for session {}: {}", session_id, e);
                Ok(Outcome::Skipped)
            }
        }
    }
}
