//! Job and schedule definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::TriggerKey;

/// A logical, cron-scheduled measurement task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub name: String,
    pub measure_id: i64,
    /// Key of the primary trigger registered with the scheduler.
    pub trigger_key: TriggerKey,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// Job row before persistence assigns an id.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub measure_id: i64,
    pub trigger_key: TriggerKey,
}

/// Relative time window of a data segment, e.g. `begin = "-1h"`, `length = "1h"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRange {
    pub begin: String,
    pub length: String,
}

/// Binding of one data connector into a scheduled run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDataSegment {
    #[serde(alias = "data.connector.name")]
    pub data_connector_name: String,

    /// Whether this segment is the time reference of the run.
    #[serde(default, alias = "as.baseline")]
    pub baseline: bool,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "segment.range")]
    pub segment_range: Option<SegmentRange>,
}

impl JobDataSegment {
    pub fn new(data_connector_name: impl Into<String>) -> Self {
        Self {
            data_connector_name: data_connector_name.into(),
            baseline: false,
            segment_range: None,
        }
    }

    pub fn as_baseline(mut self) -> Self {
        self.baseline = true;
        self
    }

    pub fn with_range(mut self, begin: impl Into<String>, length: impl Into<String>) -> Self {
        self.segment_range = Some(SegmentRange {
            begin: begin.into(),
            length: length.into(),
        });
        self
    }
}

/// Schedule descriptor submitted by a client to create a job.
///
/// Accepts both camelCase field names and the dotted legacy names
/// (`job.name`, `measure.id`, `cron.expression`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    #[serde(default, alias = "job.name")]
    pub job_name: String,

    #[serde(alias = "measure.id")]
    pub measure_id: i64,

    #[serde(alias = "cron.expression")]
    pub cron_expression: String,

    #[serde(default, alias = "cron.time.zone")]
    pub time_zone: String,

    #[serde(default, alias = "data.segments")]
    pub segments: Vec<JobDataSegment>,
}

impl ScheduleRequest {
    pub fn new(job_name: impl Into<String>, measure_id: i64, cron_expression: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            measure_id,
            cron_expression: cron_expression.into(),
            time_zone: String::new(),
            segments: Vec::new(),
        }
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn with_segment(mut self, segment: JobDataSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Number of segments flagged as baseline.
    pub fn baseline_count(&self) -> usize {
        self.segments.iter().filter(|s| s.baseline).count()
    }
}

/// Persisted schedule, owned by exactly one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSchedule {
    pub id: i64,
    pub job_id: i64,
    pub job_name: String,
    pub measure_id: i64,
    pub cron_expression: String,
    pub time_zone: String,
    pub segments: Vec<JobDataSegment>,
}
