//! Cron trigger engine.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use dqjobs_protocols::{
    FireContext, JobKey, SchedulerAdapter, SchedulerError, TriggerHandler, TriggerInfo,
    TriggerKey, TriggerSpec,
};

use crate::trigger::Trigger;

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

/// How long in-flight handlers get to finish once the loop stops.
const HANDLER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory trigger registry driven by a periodic tick.
pub struct CronScheduler {
    triggers: Mutex<HashMap<TriggerKey, Trigger>>,
    tick: Duration,
}

impl CronScheduler {
    pub fn new() -> Self {
        Self {
            triggers: Mutex::new(HashMap::new()),
            tick: Duration::from_secs(1),
        }
    }

    /// Set the tick resolution.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.lock().len()
    }

    /// Fire every trigger due at `now` and return their contexts.
    ///
    /// Triggers that will never fire again are dropped from the registry.
    pub fn fire_due(&self, now: DateTime<Utc>) -> Vec<FireContext> {
        let mut triggers = self.triggers.lock();
        let mut fired = Vec::new();
        triggers.retain(|key, trigger| {
            if !trigger.is_due(now) {
                return true;
            }
            debug!("Trigger {} fired", key);
            fired.push(trigger.fire(now));
            if trigger.is_complete() {
                debug!("Trigger {} complete, removed", key);
                return false;
            }
            true
        });
        fired
    }

    /// Run the tick loop until `cancel` flips.
    ///
    /// Each fired context is handed to `handler` on its own task. Handlers
    /// still running at shutdown get [`HANDLER_DRAIN_TIMEOUT`] to finish
    /// before they are aborted.
    pub async fn run(
        self: Arc<Self>,
        handler: Arc<dyn TriggerHandler>,
        cancel: watch::Receiver<bool>,
    ) {
        info!("Cron scheduler started (tick: {:?})", self.tick);

        let mut interval = time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cancel = cancel;
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    while let Some(result) = in_flight.try_join_next() {
                        log_handler_result(result);
                    }
                    for context in self.fire_due(Utc::now()) {
                        let handler = handler.clone();
                        in_flight.spawn(async move {
                            handler.on_fire(context).await;
                        });
                    }
                }
                _ = cancel.changed() => {
                    info!("Cron scheduler shutting down");
                    break;
                }
            }
        }

        if in_flight.is_empty() {
            return;
        }
        info!("Waiting for {} in-flight trigger handler(s)", in_flight.len());
        let drained = time::timeout(HANDLER_DRAIN_TIMEOUT, async {
            while let Some(result) = in_flight.join_next().await {
                log_handler_result(result);
            }
        })
        .await;
        if drained.is_err() {
            warn!("Aborting {} trigger handler(s) still running", in_flight.len());
            in_flight.abort_all();
        }
    }
}

fn log_handler_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Trigger handler task failed: {}", e);
    }
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchedulerAdapter for CronScheduler {
    async fn check_exists(&self, key: &TriggerKey) -> Result<bool, SchedulerError> {
        Ok(self.triggers.lock().contains_key(key))
    }

    async fn schedule(
        &self,
        job_key: JobKey,
        trigger_key: TriggerKey,
        spec: TriggerSpec,
        context: FireContext,
    ) -> Result<(), SchedulerError> {
        let trigger = Trigger::new(job_key, trigger_key.clone(), spec, context, Utc::now())?;

        let mut triggers = self.triggers.lock();
        if triggers.contains_key(&trigger_key) {
            return Err(SchedulerError::TriggerExists(trigger_key.to_string()));
        }
        debug!(
            "Scheduled trigger {} for job {}, next fire at {:?}",
            trigger_key,
            trigger.job_key(),
            trigger.info().next_fire_time
        );
        triggers.insert(trigger_key, trigger);
        Ok(())
    }

    async fn pause_job(&self, job_key: &JobKey) -> Result<bool, SchedulerError> {
        let mut triggers = self.triggers.lock();
        let mut found = false;
        for trigger in triggers.values_mut().filter(|t| t.job_key() == job_key) {
            trigger.pause();
            found = true;
        }
        if found {
            debug!("Paused job {}", job_key);
        }
        Ok(found)
    }

    async fn triggers_of_job(&self, job_key: &JobKey) -> Result<Vec<TriggerInfo>, SchedulerError> {
        let triggers = self.triggers.lock();
        let mut infos: Vec<TriggerInfo> = triggers
            .values()
            .filter(|t| t.job_key() == job_key)
            .map(Trigger::info)
            .collect();
        infos.sort_by(|a, b| a.key.name.cmp(&b.key.name));
        Ok(infos)
    }
}
