//! Fixed-delay background loops for instance expiry and status polling.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::lifecycle::JobLifecycleManager;
use crate::poller::ExecutionStatusPoller;

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;

pub struct BackgroundSweeps {
    lifecycle: Arc<JobLifecycleManager>,
    poller: Arc<ExecutionStatusPoller>,
    expiry_interval: Duration,
    poll_interval: Duration,
}

impl BackgroundSweeps {
    pub fn new(
        lifecycle: Arc<JobLifecycleManager>,
        poller: Arc<ExecutionStatusPoller>,
        expiry_interval: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            lifecycle,
            poller,
            expiry_interval,
            poll_interval,
        }
    }

    /// Start both loops. They stop once `cancel` changes.
    pub fn spawn(self, cancel: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let lifecycle = self.lifecycle;
        let expiry = tokio::spawn(run_periodic(
            "expired instance sweep",
            self.expiry_interval,
            cancel.clone(),
            move || {
                let lifecycle = lifecycle.clone();
                async move {
                    match lifecycle.delete_expired_job_instances().await {
                        Ok(purged) => debug!("Expired instance sweep purged {} rows", purged),
                        Err(e) => error!("Expired instance sweep failed: {}", e),
                    }
                }
            },
        ));

        let poller = self.poller;
        let polling = tokio::spawn(run_periodic(
            "session status poll",
            self.poll_interval,
            cancel,
            move || {
                let poller = poller.clone();
                async move {
                    if let Err(e) = poller.sync_instances_of_all_jobs().await {
                        error!("Session status poll failed: {}", e);
                    }
                }
            },
        ));

        vec![expiry, polling]
    }
}

/// Run `sweep` every `period`, measured from the end of the previous run.
/// A running sweep is never interrupted by cancellation.
async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
    mut sweep: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!("Starting {} (interval: {:?})", name, period);
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sweep().await;
                interval.reset();
            }
            _ = cancel.changed() => {
                info!("Stopping {}", name);
                break;
            }
        }
    }
}
