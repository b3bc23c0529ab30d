//! Error types for agent-runner

use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors that can occur while creating or processing runs
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Missing entity or invalid record transition
    #[error(transparent)]
    Core(#[from] psscript_core::Error),

    /// The model gateway rejected or failed the request
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The gateway did not answer in time
    #[error("Run timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// Processing was cancelled on request
    #[error("Run was cancelled")]
    Cancelled,

    /// Processing panicked
    #[error("Run processing panicked: {message}")]
    Panicked { message: String },

    /// A run did not reach a terminal state while being waited on
    #[error("Run {run_id} did not finish within {millis} ms")]
    WaitTimeout { run_id: Uuid, millis: u64 },

    /// A credential is already held for this run
    #[error("A credential is already held for run {run_id}")]
    CredentialConflict { run_id: Uuid },
}

impl RunnerError {
    /// Whether this error reports a missing agent, thread, tool or run
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_not_found())
    }
}
