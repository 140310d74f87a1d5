//! Application state.

use std::sync::Arc;
use std::time::Instant;

use dqjobs_core::JobLifecycleManager;

/// State shared across handlers.
pub struct ApiState {
    pub lifecycle: Arc<JobLifecycleManager>,
    start_time: Instant,
}

impl ApiState {
    pub fn new(lifecycle: Arc<JobLifecycleManager>) -> Self {
        Self {
            lifecycle,
            start_time: Instant::now(),
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
