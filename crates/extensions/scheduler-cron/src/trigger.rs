//! Registered triggers and cron parsing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use dqjobs_protocols::{
    CronSpec, FireContext, JobKey, SchedulerError, TriggerInfo, TriggerKey, TriggerSpec,
    TriggerState,
};

use crate::timezone::{TriggerZone, parse_time_zone};

/// Parse a Quartz-style cron spec (seconds first, 6 or 7 fields).
///
/// `?` is accepted in any field and read as `*`.
pub fn parse_cron(spec: &CronSpec) -> Result<(Schedule, TriggerZone), SchedulerError> {
    let fields: Vec<&str> = spec
        .expression
        .split_whitespace()
        .map(|field| if field == "?" { "*" } else { field })
        .collect();
    if fields.len() != 6 && fields.len() != 7 {
        return Err(SchedulerError::InvalidSchedule(format!(
            "'{}': expected 6 or 7 fields, got {}",
            spec.expression,
            fields.len()
        )));
    }

    let schedule = Schedule::from_str(&fields.join(" "))
        .map_err(|e| SchedulerError::InvalidSchedule(format!("'{}': {}", spec.expression, e)))?;
    let zone = parse_time_zone(&spec.time_zone)?;
    Ok((schedule, zone))
}

enum TriggerKind {
    Cron {
        schedule: Schedule,
        zone: TriggerZone,
        expression: String,
    },
    Once,
}

pub(crate) struct Trigger {
    key: TriggerKey,
    job_key: JobKey,
    kind: TriggerKind,
    context: FireContext,
    state: TriggerState,
    next_fire_time: Option<DateTime<Utc>>,
    previous_fire_time: Option<DateTime<Utc>>,
}

impl Trigger {
    pub(crate) fn new(
        job_key: JobKey,
        key: TriggerKey,
        spec: TriggerSpec,
        context: FireContext,
        now: DateTime<Utc>,
    ) -> Result<Self, SchedulerError> {
        let (kind, next_fire_time) = match spec {
            TriggerSpec::Cron(cron) => {
                let (schedule, zone) = parse_cron(&cron)?;
                let kind = TriggerKind::Cron {
                    schedule,
                    zone,
                    expression: cron.expression,
                };
                let next = next_cron_fire(&kind, now).ok_or_else(|| {
                    SchedulerError::InvalidSchedule(format!("trigger {key} will never fire"))
                })?;
                (kind, next)
            }
            TriggerSpec::Once(at) => (TriggerKind::Once, at),
        };

        Ok(Self {
            key,
            job_key,
            kind,
            context,
            state: TriggerState::Normal,
            next_fire_time: Some(next_fire_time),
            previous_fire_time: None,
        })
    }

    pub(crate) fn job_key(&self) -> &JobKey {
        &self.job_key
    }

    pub(crate) fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == TriggerState::Normal && self.next_fire_time.is_some_and(|next| next <= now)
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.state == TriggerState::Complete
    }

    /// Record a firing at `now` and advance to the next fire time.
    ///
    /// Missed occurrences collapse into this one firing.
    pub(crate) fn fire(&mut self, now: DateTime<Utc>) -> FireContext {
        self.previous_fire_time = self.next_fire_time;
        self.next_fire_time = next_cron_fire(&self.kind, now);
        if self.next_fire_time.is_none() {
            self.state = TriggerState::Complete;
        }
        self.context.clone()
    }

    /// Paused and completed triggers stay as they are.
    pub(crate) fn pause(&mut self) {
        if matches!(
            self.state,
            TriggerState::Normal | TriggerState::Blocked | TriggerState::Error
        ) {
            self.state = TriggerState::Paused;
        }
    }

    pub(crate) fn info(&self) -> TriggerInfo {
        TriggerInfo {
            key: self.key.clone(),
            job_key: self.job_key.clone(),
            state: self.state,
            next_fire_time: self.next_fire_time,
            previous_fire_time: self.previous_fire_time,
            cron_expression: match &self.kind {
                TriggerKind::Cron { expression, .. } => Some(expression.clone()),
                TriggerKind::Once => None,
            },
        }
    }
}

fn next_cron_fire(kind: &TriggerKind, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match kind {
        TriggerKind::Cron { schedule, zone, .. } => zone.next_after(schedule, after),
        TriggerKind::Once => None,
    }
}
