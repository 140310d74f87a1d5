//! Livy batch session client for dqjobs.
//!
//! Implements [`ExecutionService`](dqjobs_protocols::ExecutionService) on top
//! of the Livy REST API: measurements are submitted as batches and their
//! state is polled by batch id.

mod client;
mod types;

pub use client::{LivyClient, LivyOptions};
