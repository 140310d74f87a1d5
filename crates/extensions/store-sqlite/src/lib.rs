//! SQLite persistence for dqjobs.
//!
//! One [`SqliteStore`] implements the job, instance and measure
//! repositories over a single connection.

mod instances;
mod jobs;
mod measures;
mod rows;
mod schema;
mod store;

pub use store::SqliteStore;
