//! Scheduling and execution configuration types (scheduler, instance, livy).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Trigger engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Group of the primary cron triggers.
    #[serde(default = "default_group")]
    pub group: String,

    /// Group of the one-shot predicate triggers.
    #[serde(default = "default_predicate_group")]
    pub predicate_group: String,

    /// Resolution of the trigger tick loop.
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

impl SchedulerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            group: default_group(),
            predicate_group: default_predicate_group(),
            tick_millis: default_tick_millis(),
        }
    }
}

fn default_group() -> String {
    "BA".to_string()
}

fn default_predicate_group() -> String {
    "PG".to_string()
}

fn default_tick_millis() -> u64 {
    1000
}

/// Job instance retention and background sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// How long an instance is kept before the expiry sweep reclaims it.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    #[serde(default = "default_expiry_sweep_secs")]
    pub expiry_sweep_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl InstanceConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            expiry_sweep_secs: default_expiry_sweep_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_retention_secs() -> u64 {
    7 * 24 * 3600
}

fn default_expiry_sweep_secs() -> u64 {
    3600
}

fn default_poll_interval_secs() -> u64 {
    300
}

/// Remote execution service (Livy batch API) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivyConfig {
    /// Batch endpoint, e.g. `http://localhost:8998/batches`.
    #[serde(default = "default_livy_uri")]
    pub uri: String,

    /// Cluster manager UI; application links are built under it.
    #[serde(default = "default_spark_uri")]
    pub spark_uri: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Measure application artifact.
    #[serde(default = "default_file")]
    pub file: String,

    #[serde(default = "default_class_name")]
    pub class_name: String,

    /// Extra properties forwarded with every submission.
    #[serde(default)]
    pub conf: HashMap<String, String>,
}

impl LivyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LivyConfig {
    fn default() -> Self {
        Self {
            uri: default_livy_uri(),
            spark_uri: default_spark_uri(),
            timeout_secs: default_timeout_secs(),
            file: default_file(),
            class_name: default_class_name(),
            conf: HashMap::new(),
        }
    }
}

fn default_livy_uri() -> String {
    "http://localhost:8998/batches".to_string()
}

fn default_spark_uri() -> String {
    "http://localhost:8088".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_file() -> String {
    "hdfs:///griffin/griffin-measure.jar".to_string()
}

fn default_class_name() -> String {
    "org.apache.griffin.measure.Application".to_string()
}
