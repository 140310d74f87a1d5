//! Remote execution service errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The service could not be reached, timed out, or answered with a
    /// non-success status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body was not the expected JSON object.
    #[error("Malformed response: {0}")]
    MalformedBody(String),

    #[error("Unrecognized session state: {0}")]
    UnrecognizedState(String),
}

impl ExecutionError {
    /// Whether the failure means the remote side is unreachable, as opposed
    /// to reachable but answering with data we cannot interpret.
    pub fn is_transport(&self) -> bool {
        matches!(self, ExecutionError::Transport(_))
    }
}
