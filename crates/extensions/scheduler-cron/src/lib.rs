//! In-process trigger engine for dqjobs.
//!
//! [`CronScheduler`] keeps registered triggers in memory, fires the due ones
//! on every tick and hands their [`FireContext`](dqjobs_protocols::FireContext)
//! to a [`TriggerHandler`](dqjobs_protocols::TriggerHandler).

mod scheduler;
mod timezone;
mod trigger;

pub use scheduler::CronScheduler;
pub use timezone::{TriggerZone, parse_time_zone};
pub use trigger::parse_cron;
