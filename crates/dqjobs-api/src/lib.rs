//! # dqjobs API
//!
//! HTTP surface of the job service.
//!
//! ```text
//! /api/v1
//!   GET    /jobs             - Alive jobs
//!   POST   /job              - Create job
//!   DELETE /job?jobName=     - Delete jobs by name
//!   DELETE /job/{id}         - Delete job by id
//!   GET    /jobs/instances   - Paginated instances of a job
//!   GET    /job/health       - Health aggregate
//!   POST   /measure          - Register measure
//!   GET    /measures         - Active measures
//!   DELETE /measure/{id}     - Retire measure and its jobs
//! /healthz                   - Liveness
//! ```

pub mod error;
pub mod http;
pub mod message;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use http::routes::create_router;
pub use message::OperationMessage;
pub use server::{ApiConfig, ApiServer};
pub use state::ApiState;
