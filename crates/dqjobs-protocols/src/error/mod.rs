//! Error types for the collaborator boundary.

mod execution;
mod scheduler;
mod store;

pub use execution::*;
pub use scheduler::*;
pub use store::*;
